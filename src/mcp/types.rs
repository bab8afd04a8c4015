//! Wire types for the tool server protocol
//!
//! These mirror the JSON-RPC 2.0 subset the harness speaks: a request
//! envelope, a response carrying either `result` or `error`, and the
//! content parts found inside a `tools/call` result.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON-RPC protocol version sent with every request
pub const JSONRPC_VERSION: &str = "2.0";

/// Methods the harness sends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "tools/call")]
    ToolsCall,
    #[serde(rename = "tools/list")]
    ToolsList,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::ToolsCall => "tools/call",
            Method::ToolsList => "tools/list",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request before it is given an id
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub method: Method,
    pub params: Map<String, Value>,
}

impl ToolCall {
    /// `tools/call` with `{name, arguments}`
    pub fn call(name: &str, arguments: Map<String, Value>) -> Self {
        let mut params = Map::new();
        params.insert("name".to_string(), Value::String(name.to_string()));
        params.insert("arguments".to_string(), Value::Object(arguments));
        Self {
            method: Method::ToolsCall,
            params,
        }
    }

    /// `tools/list` with empty params
    pub fn list() -> Self {
        Self {
            method: Method::ToolsList,
            params: Map::new(),
        }
    }
}

/// Request envelope written as one line
#[derive(Debug, Serialize)]
pub struct RequestEnvelope<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: Method,
    pub params: &'a Map<String, Value>,
}

impl<'a> RequestEnvelope<'a> {
    pub fn new(id: u64, call: &'a ToolCall) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: call.method,
            params: &call.params,
        }
    }
}

/// A response line as received
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct RawResponse {
    /// Echoed request id, when the server sends one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl RawResponse {
    /// Numeric id echoed by the server, if any
    pub fn numeric_id(&self) -> Option<u64> {
        self.id.as_ref().and_then(Value::as_u64)
    }

    /// Human readable message for an explicit error object
    ///
    /// Uses `error.message` when it is a string, otherwise the JSON form of
    /// the whole error value.
    pub fn error_message(&self) -> Option<String> {
        let error = self.error.as_ref()?;
        match error.get("message").and_then(Value::as_str) {
            Some(message) => Some(message.to_string()),
            None => Some(match error {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
        }
    }
}

/// One typed part of a `tools/call` result
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Metadata for one remote tool, as returned by `tools/list`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}
