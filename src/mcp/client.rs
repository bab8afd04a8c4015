//! Tool server client
//!
//! Owns the server subprocess and speaks strict lock-step JSON-RPC over its
//! stdin/stdout: one request line out, one response line back, never more
//! than one request in flight.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio_util::sync::CancellationToken;

use crate::common::config::ServerConfig;
use crate::common::{Error, Result};

use super::codec;
use super::decode::{decode_response, ToolResponse};
use super::types::{Method, RawResponse, RequestEnvelope, ToolCall, ToolInfo};

/// Anything that can invoke a remote tool
///
/// Implementations fold transport and tool faults into a failed
/// [`ToolResponse`]. The only error they return is [`Error::NotStarted`].
#[async_trait]
pub trait ToolCaller: Send {
    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
        timeout: Duration,
    ) -> Result<ToolResponse>;
}

/// A running server and its pipes
struct ServerProcess {
    child: Child,
    reader: BufReader<ChildStdout>,
    writer: BufWriter<ChildStdin>,
}

/// Client for a tool server speaking line-delimited JSON-RPC over stdio
pub struct ToolClient {
    config: ServerConfig,
    process: Option<ServerProcess>,
    /// Next request id; never reset, so ids stay unique across restarts
    next_id: u64,
    /// Why the last automatic restart failed, if it did
    restart_error: Option<String>,
}

impl ToolClient {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            process: None,
            next_id: 1,
            restart_error: None,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Whether a server process is currently owned
    pub fn is_started(&self) -> bool {
        self.process.is_some()
    }

    /// Id of the most recently issued request (0 before the first one)
    pub fn last_request_id(&self) -> u64 {
        self.next_id - 1
    }

    /// Spawn the server and wait out its warm-up period
    ///
    /// Calling this while already started does nothing.
    pub async fn start(&mut self) -> Result<()> {
        if self.process.is_some() {
            return Ok(());
        }

        let program = self.config.resolve_command();
        let mut cmd = Command::new(&program);
        cmd.args(&self.config.args)
            .envs(self.config.launch_env())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &self.config.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd.spawn().map_err(|e| {
            Error::SpawnFailed(format!("Failed to start {}: {}", program.display(), e))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or(Error::StreamUnavailable("stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or(Error::StreamUnavailable("stdout"))?;

        // Server diagnostics end up in our log instead of filling the pipe
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(target: "harness::server", "{}", line);
                }
            });
        }

        tracing::info!(
            "Started tool server {} (pid {:?}, headed={}, slow_mo={}ms)",
            program.display(),
            child.id(),
            self.config.headed,
            self.config.slow_mo_ms
        );

        self.process = Some(ServerProcess {
            child,
            reader: BufReader::new(stdout),
            writer: BufWriter::new(stdin),
        });
        self.restart_error = None;

        tokio::time::sleep(self.config.warmup()).await;

        Ok(())
    }

    /// Ask the server to exit, killing it if it has not exited in time
    ///
    /// Calling this while stopped does nothing.
    pub async fn stop(&mut self) -> Result<()> {
        if self.process.is_some() && !self.is_running() {
            tracing::debug!("Tool server already exited");
        }
        let Some(process) = self.process.take() else {
            return Ok(());
        };
        let ServerProcess {
            mut child, writer, ..
        } = process;

        // Closing stdin is the polite way to end a stdio server
        drop(writer);

        #[cfg(unix)]
        if let Some(pid) = child.id() {
            // SIGTERM; failure just means the process is already gone
            unsafe {
                libc::kill(pid as i32, libc::SIGTERM);
            }
        }

        match tokio::time::timeout(self.config.stop_timeout(), child.wait()).await {
            Ok(Ok(status)) => {
                tracing::info!("Tool server exited with {}", status);
            }
            Ok(Err(e)) => {
                tracing::warn!("Failed to wait for tool server: {}", e);
            }
            Err(_) => {
                tracing::warn!(
                    "Tool server did not exit within {}s, killing it",
                    self.config.stop_timeout_secs
                );
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to kill tool server: {}", e);
                }
            }
        }

        Ok(())
    }

    /// Stop and start again, keeping the request id sequence
    pub async fn restart(&mut self) -> Result<()> {
        tracing::info!("Restarting tool server");
        self.stop().await?;
        self.start().await
    }

    /// Check if the server process is still running
    pub fn is_running(&mut self) -> bool {
        match self.process.as_mut() {
            Some(process) => process.child.try_wait().ok().flatten().is_none(),
            None => false,
        }
    }

    /// Send one request and read exactly one response line
    pub async fn send_request(
        &mut self,
        method: Method,
        params: Map<String, Value>,
    ) -> Result<RawResponse> {
        let process = self.process.as_mut().ok_or(Error::NotStarted)?;

        let id = self.next_id;
        self.next_id += 1;

        let call = ToolCall { method, params };
        let json = serde_json::to_string(&RequestEnvelope::new(id, &call))?;
        tracing::debug!("MCP >>> {}", json);

        codec::write_line(&mut process.writer, &json).await?;

        let line = codec::read_line(&mut process.reader).await?;
        tracing::debug!("MCP <<< {}", line);

        let response: RawResponse = serde_json::from_str(&line)
            .map_err(|e| Error::Protocol(format!("Invalid JSON: {}", e)))?;

        if let Some(response_id) = response.numeric_id() {
            if response_id != id {
                return Err(Error::Protocol(format!(
                    "Response ID mismatch: expected {}, got {}",
                    id, response_id
                )));
            }
        }

        Ok(response)
    }

    /// Send a request bounded by a timeout and an optional cancellation token
    async fn bounded_request(
        &mut self,
        call: ToolCall,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<RawResponse> {
        if self.process.is_none() {
            return Err(match &self.restart_error {
                Some(message) => Error::SpawnFailed(message.clone()),
                None => Error::NotStarted,
            });
        }

        let cancelled = async {
            match cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            result = tokio::time::timeout(timeout, self.send_request(call.method, call.params)) => {
                result.unwrap_or(Err(Error::Timeout(timeout)))
            }
            _ = cancelled => Err(Error::Cancelled),
        }
    }

    /// Bring the transport back into lock-step after an abandoned exchange
    async fn recover(&mut self) {
        if !self.config.restart_on_timeout {
            return;
        }
        if let Err(e) = self.restart().await {
            tracing::error!("Failed to restart tool server: {}", e);
            self.restart_error = Some(e.to_string());
        }
    }

    /// Invoke a tool, abandoning the call when `cancel` fires
    ///
    /// Behaves like [`ToolCaller::call_tool`]; a cancelled call yields a
    /// failed response and restarts the server when configured to.
    pub async fn call_tool_cancellable(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<ToolResponse> {
        let call = ToolCall::call(name, arguments);

        let raw = match self.bounded_request(call, timeout, cancel).await {
            Ok(raw) => raw,
            Err(Error::NotStarted) => return Err(Error::NotStarted),
            Err(e) => {
                tracing::warn!("Tool '{}' failed at transport level: {}", name, e);
                if e.poisons_transport() {
                    self.recover().await;
                }
                return Ok(ToolResponse::from(e));
            }
        };

        Ok(decode_response(raw).unwrap_or_else(ToolResponse::from))
    }

    /// List the tools the server exposes
    ///
    /// A timed-out or broken exchange restarts the server like a tool call
    /// does, then returns the error.
    pub async fn list_tools(&mut self, timeout: Duration) -> Result<Vec<ToolInfo>> {
        let response = match self.bounded_request(ToolCall::list(), timeout, None).await {
            Ok(response) => response,
            Err(e) => {
                if e.poisons_transport() {
                    self.recover().await;
                }
                return Err(e);
            }
        };

        if let Some(message) = response.error_message() {
            return Err(Error::Tool(message));
        }

        match response.result.and_then(|mut r| r.get_mut("tools").map(Value::take)) {
            Some(tools) => Ok(serde_json::from_value(tools)?),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl ToolCaller for ToolClient {
    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
        timeout: Duration,
    ) -> Result<ToolResponse> {
        self.call_tool_cancellable(name, arguments, timeout, None)
            .await
    }
}

impl Drop for ToolClient {
    fn drop(&mut self) {
        // Best-effort since we can't await in drop
        if let Some(process) = self.process.as_mut() {
            let _ = process.child.start_kill();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_request_before_start_is_usage_error() {
        let mut client = ToolClient::new(ServerConfig::default());
        let err = client
            .send_request(Method::ToolsList, Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotStarted));

        let err = client
            .call_tool("list_projects", Map::new(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotStarted));
        assert_eq!(client.last_request_id(), 0);
    }

    #[tokio::test]
    async fn test_stop_when_never_started() {
        let mut client = ToolClient::new(ServerConfig::default());
        client.stop().await.unwrap();
        client.stop().await.unwrap();
        assert!(!client.is_started());
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let mut client = ToolClient::new(ServerConfig {
            command: "/nonexistent/tool-server-12345".to_string(),
            args: Vec::new(),
            warmup_ms: 0,
            ..Default::default()
        });
        let err = client.start().await.unwrap_err();
        assert!(matches!(err, Error::SpawnFailed(_)));
        assert!(!client.is_started());
    }
}
