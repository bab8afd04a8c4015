//! mcp-harness - integration test driver for stdio tool servers
//!
//! This library launches a tool server speaking line-delimited JSON-RPC,
//! invokes its tools with bounded waits, decodes their responses, and runs
//! dependency-ordered suites that create and clean up remote resources.

pub mod cli;
pub mod commands;
pub mod common;
pub mod mcp;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use mcp::{Payload, ToolCaller, ToolClient, ToolResponse};
