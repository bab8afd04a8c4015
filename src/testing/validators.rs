//! Validator library
//!
//! Validators are pure predicates over decoded content. Each one returns a
//! [`Verdict`] carrying a diagnostic message whether it passed or not.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::mcp::Payload;

/// Result of applying a validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub passed: bool,
    pub message: String,
}

impl Verdict {
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
        }
    }
}

/// A validator supplied as code rather than declared in a suite file
#[derive(Clone)]
pub struct CustomValidator {
    name: String,
    check: Arc<dyn Fn(&Payload) -> Verdict + Send + Sync>,
}

impl CustomValidator {
    pub fn new(
        name: impl Into<String>,
        check: impl Fn(&Payload) -> Verdict + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }
}

impl fmt::Debug for CustomValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomValidator")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Checks applied to the content of a tool response
///
/// In suite files these are written as `validator: list`,
/// `validator: dict`, `validator: not_empty`, `validator: project_opened`
/// or `validator: { contains: "created" }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "ValidatorDecl")]
pub enum Validator {
    /// Content is a sequence
    List,
    /// Content is a key/value mapping
    Dict,
    /// Case-insensitive substring of the content's string form
    Contains(String),
    /// Content is truthy and its trimmed string form is non-empty
    NotEmpty,
    /// Mapping with `status == "opened"` or a `url` field
    ProjectOpened,
    Custom(CustomValidator),
}

/// Suite-file spelling of a validator: a bare name or `contains: <needle>`
#[derive(Deserialize)]
#[serde(untagged)]
enum ValidatorDecl {
    Name(String),
    Contains(ContainsDecl),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ContainsDecl {
    contains: String,
}

impl TryFrom<ValidatorDecl> for Validator {
    type Error = String;

    fn try_from(decl: ValidatorDecl) -> std::result::Result<Self, Self::Error> {
        match decl {
            ValidatorDecl::Contains(decl) => Ok(Validator::Contains(decl.contains)),
            ValidatorDecl::Name(name) => match name.as_str() {
                "list" => Ok(Validator::List),
                "dict" => Ok(Validator::Dict),
                "not_empty" => Ok(Validator::NotEmpty),
                "project_opened" => Ok(Validator::ProjectOpened),
                other => Err(format!(
                    "unknown validator '{}', expected list, dict, not_empty, project_opened or contains",
                    other
                )),
            },
        }
    }
}

impl Validator {
    pub fn contains(needle: impl Into<String>) -> Self {
        Validator::Contains(needle.into())
    }

    pub fn custom(
        name: impl Into<String>,
        check: impl Fn(&Payload) -> Verdict + Send + Sync + 'static,
    ) -> Self {
        Validator::Custom(CustomValidator::new(name, check))
    }

    /// Short label for plans and reports
    pub fn label(&self) -> String {
        match self {
            Validator::List => "list".to_string(),
            Validator::Dict => "dict".to_string(),
            Validator::Contains(needle) => format!("contains '{}'", needle),
            Validator::NotEmpty => "not empty".to_string(),
            Validator::ProjectOpened => "project opened".to_string(),
            Validator::Custom(custom) => custom.name.clone(),
        }
    }

    pub fn check(&self, content: &Payload) -> Verdict {
        match self {
            Validator::List => match content.as_array() {
                Some(items) => Verdict::pass(format!("Got list with {} items", items.len())),
                None => Verdict::fail(format!("Expected list, got {}", content.type_name())),
            },
            Validator::Dict => match content.as_object() {
                Some(map) => {
                    let keys: Vec<&str> = map.keys().take(5).map(String::as_str).collect();
                    Verdict::pass(format!("Got dict with keys: {:?}", keys))
                }
                None => Verdict::fail(format!("Expected dict, got {}", content.type_name())),
            },
            Validator::Contains(needle) => {
                let haystack = content.string_form().to_lowercase();
                if haystack.contains(&needle.to_lowercase()) {
                    Verdict::pass(format!("Response contains '{}'", needle))
                } else {
                    Verdict::fail(format!("Response does not contain '{}'", needle))
                }
            }
            Validator::NotEmpty => {
                if content.is_truthy() && !content.string_form().trim().is_empty() {
                    Verdict::pass("Got non-empty response")
                } else {
                    Verdict::fail("Response was empty")
                }
            }
            Validator::ProjectOpened => {
                if let Some(map) = content.as_object() {
                    if map.get("status").and_then(Value::as_str) == Some("opened") {
                        return Verdict::pass("Project opened successfully");
                    }
                    if let Some(url) = map.get("url") {
                        let url = match url {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        return Verdict::pass(format!("Project at URL: {}", url));
                    }
                }
                Verdict::fail("Invalid open_project response structure")
            }
            Validator::Custom(custom) => (custom.check)(content),
        }
    }
}
