//! Test case model
//!
//! A [`TestCase`] is declarative data built once and never mutated. Running
//! it produces exactly one [`TestResult`].

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::mcp::ToolResponse;

use super::validators::Validator;

/// A tool name plus arguments, used for setup and cleanup hooks
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolInvocation {
    pub tool: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl ToolInvocation {
    pub fn new(tool: impl Into<String>, args: Value) -> Self {
        Self {
            tool: tool.into(),
            args: into_object(args),
        }
    }
}

/// Turn a `json!` literal into an argument map
///
/// `null` means no arguments; any other non-object is wrapped as `{"value": ..}`.
pub fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

/// One exercised tool operation
#[derive(Debug, Clone, Deserialize)]
pub struct TestCase {
    /// Unique name within a suite
    pub name: String,
    /// Tool to invoke
    pub tool: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub args: Map<String, Value>,
    #[serde(default = "default_expected_success")]
    pub expected_success: bool,
    /// Applied to the content of a success; when `expected_success` is
    /// false it sees the error message, so `contains` matches that text
    #[serde(default)]
    pub validator: Option<Validator>,
    /// Name of an earlier test that must have passed
    #[serde(default)]
    pub depends_on: Option<String>,
    #[serde(default)]
    pub setup: Option<ToolInvocation>,
    #[serde(default)]
    pub cleanup: Option<ToolInvocation>,
    /// Overrides the configured call timeout
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_expected_success() -> bool {
    true
}

impl TestCase {
    pub fn new(name: impl Into<String>, tool: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tool: tool.into(),
            description: description.into(),
            args: Map::new(),
            expected_success: true,
            validator: None,
            depends_on: None,
            setup: None,
            cleanup: None,
            timeout_secs: None,
        }
    }

    pub fn args(mut self, args: Value) -> Self {
        self.args = into_object(args);
        self
    }

    pub fn expect_failure(mut self) -> Self {
        self.expected_success = false;
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on = Some(name.into());
        self
    }

    pub fn setup(mut self, tool: impl Into<String>, args: Value) -> Self {
        self.setup = Some(ToolInvocation::new(tool, args));
        self
    }

    pub fn cleanup(mut self, tool: impl Into<String>, args: Value) -> Self {
        self.cleanup = Some(ToolInvocation::new(tool, args));
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Call timeout for this test, falling back to `default`
    pub fn timeout(&self, default: Duration) -> Duration {
        self.timeout_secs.map(Duration::from_secs).unwrap_or(default)
    }

    /// Non-executing description of the call this test makes
    pub fn replay(&self) -> Replay {
        Replay {
            tool: self.tool.clone(),
            args_json: if self.args.is_empty() {
                None
            } else {
                Some(Value::Object(self.args.clone()).to_string())
            },
        }
    }
}

/// A test rendered as a tool name and JSON-encoded arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replay {
    pub tool: String,
    pub args_json: Option<String>,
}

impl Replay {
    /// Render as `<prefix><tool>(<json>)`
    pub fn render(&self, prefix: &str) -> String {
        format!(
            "{}{}({})",
            prefix,
            self.tool,
            self.args_json.as_deref().unwrap_or("")
        )
    }
}

/// Lifecycle state of a test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestStatus::Pending => "pending",
            TestStatus::Running => "running",
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Recorded outcome of one test
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub name: String,
    pub tool: String,
    pub status: TestStatus,
    pub message: String,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    /// Raw response of the main call, kept for diagnostics
    pub response: Option<ToolResponse>,
}

pub(crate) fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

impl TestResult {
    pub fn skipped(test: &TestCase, message: impl Into<String>) -> Self {
        Self {
            name: test.name.clone(),
            tool: test.tool.clone(),
            status: TestStatus::Skipped,
            message: message.into(),
            duration: Duration::ZERO,
            response: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == TestStatus::Failed
    }
}
