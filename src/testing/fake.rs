//! Scripted [`ToolCaller`] for unit tests

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::common::Result;
use crate::mcp::{Payload, ToolCaller, ToolResponse};

/// Answers each tool with a fixed response and records every call
///
/// Tools without a scripted response succeed with the text `ok`.
#[derive(Debug, Default)]
pub struct FakeCaller {
    responses: HashMap<String, ToolResponse>,
    pub calls: Vec<(String, Map<String, Value>)>,
}

impl FakeCaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, tool: &str, content: Value) -> Self {
        self.responses.insert(
            tool.to_string(),
            ToolResponse::Success(Payload::Structured(content)),
        );
        self
    }

    pub fn respond_text(mut self, tool: &str, text: &str) -> Self {
        self.responses.insert(
            tool.to_string(),
            ToolResponse::Success(Payload::Text(text.to_string())),
        );
        self
    }

    pub fn fail(mut self, tool: &str, error: &str) -> Self {
        self.responses
            .insert(tool.to_string(), ToolResponse::failure(error));
        self
    }

    pub fn tools_called(&self) -> Vec<String> {
        self.calls.iter().map(|(tool, _)| tool.clone()).collect()
    }
}

#[async_trait]
impl ToolCaller for FakeCaller {
    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
        _timeout: Duration,
    ) -> Result<ToolResponse> {
        self.calls.push((name.to_string(), arguments));
        Ok(self
            .responses
            .get(name)
            .cloned()
            .unwrap_or_else(|| ToolResponse::Success(Payload::Text("ok".to_string()))))
    }
}
