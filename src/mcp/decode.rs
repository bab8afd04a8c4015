//! Response decoding
//!
//! Remote tools answer either with a JSON value encoded in a text part or
//! with plain text, and there is no way to know which ahead of time. The
//! decoder tries structured parsing first and falls back to the raw text,
//! so everything downstream matches on [`Payload`] instead of guessing.

use std::borrow::Cow;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::common::Error;

use super::types::{ContentPart, RawResponse};

/// Decoded content of a successful tool call
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Text that parsed as JSON, or the raw result object
    Structured(Value),
    /// Text that did not parse as JSON
    Text(String),
}

impl Payload {
    /// Decode a text part opportunistically
    pub fn from_text(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Payload::Structured(value),
            Err(_) => Payload::Text(text.to_string()),
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Payload::Structured(Value::Array(items)) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            Payload::Structured(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    /// The string form used for substring checks
    ///
    /// Strings are used verbatim; any other value is rendered as compact JSON.
    pub fn string_form(&self) -> Cow<'_, str> {
        match self {
            Payload::Text(text) => Cow::Borrowed(text),
            Payload::Structured(Value::String(s)) => Cow::Borrowed(s),
            Payload::Structured(value) => Cow::Owned(value.to_string()),
        }
    }

    /// Truthiness: null, false, zero, and empty strings, arrays or objects
    /// are falsy
    pub fn is_truthy(&self) -> bool {
        match self {
            Payload::Text(text) => !text.is_empty(),
            Payload::Structured(value) => match value {
                Value::Null => false,
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
                Value::String(s) => !s.is_empty(),
                Value::Array(items) => !items.is_empty(),
                Value::Object(map) => !map.is_empty(),
            },
        }
    }

    /// Short name of the payload shape, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Payload::Text(_) => "text",
            Payload::Structured(value) => match value {
                Value::Null => "null",
                Value::Bool(_) => "bool",
                Value::Number(_) => "number",
                Value::String(_) => "string",
                Value::Array(_) => "list",
                Value::Object(_) => "dict",
            },
        }
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Payload::Structured(value) => value.serialize(serializer),
            Payload::Text(text) => serializer.serialize_str(text),
        }
    }
}

/// Outcome of one tool call
///
/// A failed call never carries content and a successful call never carries
/// an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResponse {
    Success(Payload),
    Failure(String),
}

impl ToolResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        ToolResponse::Failure(error.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResponse::Success(_))
    }

    pub fn content(&self) -> Option<&Payload> {
        match self {
            ToolResponse::Success(payload) => Some(payload),
            ToolResponse::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ToolResponse::Success(_) => None,
            ToolResponse::Failure(error) => Some(error),
        }
    }
}

impl From<Error> for ToolResponse {
    fn from(e: Error) -> Self {
        ToolResponse::Failure(e.to_string())
    }
}

#[derive(Serialize)]
struct ToolResponseRepr<'a> {
    success: bool,
    content: Option<&'a Payload>,
    error: Option<&'a str>,
}

impl Serialize for ToolResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ToolResponseRepr {
            success: self.is_success(),
            content: self.content(),
            error: self.error(),
        }
        .serialize(serializer)
    }
}

/// Interpret a raw `tools/call` response
///
/// 1. An explicit error object becomes a failure carrying `error.message`.
/// 2. Otherwise the first `"type": "text"` part of `result.content` is
///    decoded with [`Payload::from_text`].
/// 3. With no usable text part the whole result object is the payload.
///
/// A response with neither `result` nor `error` is a protocol error.
pub fn decode_response(raw: RawResponse) -> Result<ToolResponse, Error> {
    if let Some(message) = raw.error_message() {
        return Ok(ToolResponse::Failure(message));
    }

    let result = raw.result.ok_or_else(|| {
        Error::Protocol("Response contains neither 'result' nor 'error'".to_string())
    })?;

    let text = result
        .get("content")
        .and_then(Value::as_array)
        .and_then(|parts| {
            parts
                .iter()
                .filter_map(|part| ContentPart::deserialize(part).ok())
                .find(|part| part.kind == "text")
        })
        .and_then(|part| part.text);

    match text {
        Some(text) if !text.is_empty() => Ok(ToolResponse::Success(Payload::from_text(&text))),
        _ => Ok(ToolResponse::Success(Payload::Structured(result))),
    }
}
