//! Tool server protocol
//!
//! This module implements the client side of the line-delimited JSON-RPC
//! protocol spoken by stdio tool servers.

pub mod client;
pub mod codec;
pub mod decode;
pub mod types;

pub use client::{ToolCaller, ToolClient};
pub use decode::{decode_response, Payload, ToolResponse};
pub use types::{Method, RawResponse, ToolCall, ToolInfo};
