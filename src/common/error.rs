//! Error types for the harness
//!
//! Transport and tool faults are normally folded into a failed
//! [`ToolResponse`](crate::mcp::ToolResponse) at the `call_tool` boundary.
//! The variants here are what remains visible to callers: usage bugs,
//! suite construction problems, session setup failures and configuration.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Transport Errors ===
    #[error("Tool server not started. Call start() before issuing requests")]
    NotStarted,

    #[error("Tool server failed to start: {0}")]
    SpawnFailed(String),

    #[error("Tool server {0} is unavailable")]
    StreamUnavailable(&'static str),

    #[error("Tool server closed its output unexpectedly")]
    ServerClosed,

    #[error("Timed out after {} seconds waiting for a response", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("Call was cancelled")]
    Cancelled,

    // === Protocol Errors ===
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Tool returned error: {0}")]
    Tool(String),

    // === Suite Errors ===
    #[error("Duplicate test name '{0}'")]
    DuplicateTest(String),

    #[error("Test '{test}' depends on '{depends_on}', which is not declared before it")]
    UnknownDependency { test: String, depends_on: String },

    #[error("Failed to set up {resource}: {message}")]
    SetupFailed { resource: String, message: String },

    #[error("{0} test(s) failed")]
    TestsFailed(usize),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create an unknown dependency error
    pub fn unknown_dependency(test: &str, depends_on: &str) -> Self {
        Self::UnknownDependency {
            test: test.to_string(),
            depends_on: depends_on.to_string(),
        }
    }

    /// Create a resource setup failure
    pub fn setup_failed(resource: &str, message: &str) -> Self {
        Self::SetupFailed {
            resource: resource.to_string(),
            message: message.to_string(),
        }
    }

    /// Whether this error means the transport can no longer be trusted to
    /// pair requests with responses
    pub fn poisons_transport(&self) -> bool {
        matches!(
            self,
            Error::Timeout(_) | Error::Cancelled | Error::ServerClosed | Error::Io(_)
        )
    }
}
