//! Configuration file handling

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// How to launch the tool server
    #[serde(default)]
    pub server: ServerConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Remote resource handling
    #[serde(default)]
    pub resources: ResourceConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Replay rendering settings
    #[serde(default)]
    pub replay: ReplayConfig,
}

/// Launch settings for the tool server process
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Program to execute
    #[serde(default = "default_command")]
    pub command: String,

    /// Arguments to pass to the program
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Working directory for the server
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Extra environment variables
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Run the browser visibly
    #[serde(default)]
    pub headed: bool,

    /// Delay applied to each remote action, in milliseconds (0 = unset)
    #[serde(default)]
    pub slow_mo_ms: u64,

    /// Time the server needs after spawn before it accepts requests
    #[serde(default = "default_warmup")]
    pub warmup_ms: u64,

    /// How long to wait for a graceful exit before killing the server
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_secs: u64,

    /// Restart the server after a timed out or cancelled call
    #[serde(default = "default_true")]
    pub restart_on_timeout: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_args(),
            cwd: None,
            env: HashMap::new(),
            headed: false,
            slow_mo_ms: 0,
            warmup_ms: default_warmup(),
            stop_timeout_secs: default_stop_timeout(),
            restart_on_timeout: true,
        }
    }
}

fn default_command() -> String {
    "npx".to_string()
}
fn default_args() -> Vec<String> {
    vec!["tsx".to_string(), "src/server.ts".to_string()]
}
fn default_warmup() -> u64 {
    2000
}
fn default_stop_timeout() -> u64 {
    5
}
fn default_true() -> bool {
    true
}

impl ServerConfig {
    /// Environment variables the server reads to configure its browser
    pub fn launch_env(&self) -> Vec<(String, String)> {
        let mut env: Vec<(String, String)> = self
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        env.sort();
        env.push((
            "HEADED".to_string(),
            if self.headed { "true" } else { "false" }.to_string(),
        ));
        if self.slow_mo_ms > 0 {
            env.push(("SLOW_MO".to_string(), self.slow_mo_ms.to_string()));
        }
        env
    }

    /// Resolve the program to an executable path
    ///
    /// Bare program names are searched on PATH; anything containing a path
    /// separator is used as given.
    pub fn resolve_command(&self) -> PathBuf {
        let command = Path::new(&self.command);
        if command.components().count() > 1 {
            return command.to_path_buf();
        }
        which::which(&self.command).unwrap_or_else(|_| command.to_path_buf())
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize, Clone)]
pub struct Timeouts {
    /// Default bound for a single tool call (browser operations can be slow)
    #[serde(default = "default_call")]
    pub call_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            call_secs: default_call(),
        }
    }
}

fn default_call() -> u64 {
    120
}

/// Remote resource handling
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ResourceConfig {
    /// Leave created resources in place after the run
    #[serde(default)]
    pub keep: bool,
}

/// Logging settings
#[derive(Debug, Deserialize, Default, Clone)]
pub struct LoggingConfig {
    /// Also write logs to this file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Replay rendering settings
#[derive(Debug, Deserialize, Clone)]
pub struct ReplayConfig {
    /// Prefix prepended to tool names in rendered commands
    #[serde(default = "default_replay_prefix")]
    pub prefix: String,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            prefix: default_replay_prefix(),
        }
    }
}

fn default_replay_prefix() -> String {
    "mcp__claude-project__".to_string()
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.call_secs)
    }
}
