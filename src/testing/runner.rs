//! Suite runner
//!
//! Executes tests strictly in declaration order over a single
//! [`ToolCaller`]. A test whose dependency did not pass is skipped without
//! touching the server; a test's cleanup hook runs whether or not the test
//! itself succeeded.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::common::Result;
use crate::mcp::{Payload, ToolCaller, ToolResponse};

use super::model::{serialize_millis, TestCase, TestResult, TestStatus, ToolInvocation};
use super::resources::ResourceManager;
use super::suite::Suite;

/// Default per-call timeout
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Knobs for a run
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Applied to every call of a test without its own timeout
    pub call_timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// Pass/fail/skip counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Everything a run produced, in execution order
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub suite: String,
    pub results: Vec<TestResult>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

impl RunReport {
    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            total: self.results.len(),
            ..Default::default()
        };
        for result in &self.results {
            match result.status {
                TestStatus::Passed => summary.passed += 1,
                TestStatus::Failed => summary.failed += 1,
                TestStatus::Skipped => summary.skipped += 1,
                TestStatus::Pending | TestStatus::Running => {}
            }
        }
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(TestResult::is_failed)
    }

    pub fn get(&self, name: &str) -> Option<&TestResult> {
        self.results.iter().find(|r| r.name == name)
    }
}

/// Run every test of `suite` in order
///
/// `on_result` sees each result as soon as it is recorded. The only error
/// returned is a usage error from the caller (a server that was never
/// started); all test-level problems end up in the report.
pub async fn run_suite<C, F>(
    caller: &mut C,
    suite: &Suite,
    options: &RunOptions,
    mut on_result: F,
) -> Result<RunReport>
where
    C: ToolCaller,
    F: FnMut(&TestResult) + Send,
{
    let started = Instant::now();
    tracing::info!("Running suite '{}' ({} tests)", suite.name(), suite.len());

    let mut statuses: HashMap<String, TestStatus> = suite
        .tests()
        .iter()
        .map(|t| (t.name.clone(), TestStatus::Pending))
        .collect();
    let mut results = Vec::with_capacity(suite.len());

    for test in suite.tests() {
        let result = match blocked_by(test, &statuses) {
            Some(message) => {
                tracing::info!("Skipping {}: {}", test.name, message);
                TestResult::skipped(test, message)
            }
            None => {
                statuses.insert(test.name.clone(), TestStatus::Running);
                run_test(caller, test, options).await?
            }
        };

        statuses.insert(test.name.clone(), result.status);
        on_result(&result);
        results.push(result);
    }

    Ok(RunReport {
        suite: suite.name().to_string(),
        results,
        duration: started.elapsed(),
    })
}

/// [`run_suite`] inside the suite's session resources
///
/// Session resources are created before the first test and released after
/// the last one, even if the run panics. If one cannot be created, no test
/// runs and the setup error is returned.
pub async fn run_with_session<C, F>(
    manager: &ResourceManager,
    caller: &mut C,
    suite: &Suite,
    options: &RunOptions,
    on_result: F,
) -> Result<RunReport>
where
    C: ToolCaller,
    F: FnMut(&TestResult) + Send + 'static,
{
    if suite.session().is_empty() {
        return run_suite(caller, suite, options, on_result).await;
    }

    let owned = suite.clone();
    let options = *options;
    manager
        .session(
            caller,
            suite.session(),
            options.call_timeout,
            move |caller, resources| {
                tracing::info!("Session ready with {} resource(s)", resources.len());
                Box::pin(async move { run_suite(caller, &owned, &options, on_result).await })
            },
        )
        .await?
}

/// Message explaining why `test` cannot run, if it cannot
fn blocked_by(test: &TestCase, statuses: &HashMap<String, TestStatus>) -> Option<String> {
    let dep = test.depends_on.as_ref()?;
    match statuses.get(dep) {
        Some(TestStatus::Passed) => None,
        Some(status) => Some(format!("Dependency '{}' {}", dep, status)),
        None => Some(format!("Dependency '{}' not found", dep)),
    }
}

/// Run one test: setup, main call, classification, cleanup
pub async fn run_test<C: ToolCaller>(
    caller: &mut C,
    test: &TestCase,
    options: &RunOptions,
) -> Result<TestResult> {
    let timeout = test.timeout(options.call_timeout);
    let started = Instant::now();
    tracing::info!("Running {} ({})", test.name, test.tool);

    let outcome = execute(caller, test, timeout).await;

    if let Some(cleanup) = &test.cleanup {
        run_cleanup(caller, test, cleanup, timeout).await;
    }

    let (status, message, response) = outcome?;
    match status {
        TestStatus::Failed => tracing::warn!("{} failed: {}", test.name, message),
        _ => tracing::info!("{} {}: {}", test.name, status, message),
    }

    Ok(TestResult {
        name: test.name.clone(),
        tool: test.tool.clone(),
        status,
        message,
        duration: started.elapsed(),
        response: Some(response),
    })
}

async fn execute<C: ToolCaller>(
    caller: &mut C,
    test: &TestCase,
    timeout: Duration,
) -> Result<(TestStatus, String, ToolResponse)> {
    if let Some(setup) = &test.setup {
        let response = caller
            .call_tool(&setup.tool, setup.args.clone(), timeout)
            .await?;
        if let Some(error) = response.error() {
            let message = format!("Setup '{}' failed: {}", setup.tool, error);
            return Ok((TestStatus::Failed, message, response));
        }
    }

    let response = caller
        .call_tool(&test.tool, test.args.clone(), timeout)
        .await?;
    let (status, message) = classify(test, &response);
    Ok((status, message, response))
}

async fn run_cleanup<C: ToolCaller>(
    caller: &mut C,
    test: &TestCase,
    cleanup: &ToolInvocation,
    timeout: Duration,
) {
    match caller
        .call_tool(&cleanup.tool, cleanup.args.clone(), timeout)
        .await
    {
        Ok(ToolResponse::Failure(error)) => {
            tracing::warn!("Cleanup '{}' for {} failed: {}", cleanup.tool, test.name, error);
        }
        Ok(ToolResponse::Success(_)) => {
            tracing::debug!("Cleanup '{}' for {} done", cleanup.tool, test.name);
        }
        Err(e) => {
            tracing::warn!("Cleanup '{}' for {} failed: {}", cleanup.tool, test.name, e);
        }
    }
}

/// Decide pass/fail from a response
///
/// The outcome must match `expected_success` first. The validator then
/// sees the content of a success, or the error text of an expected failure.
pub fn classify(test: &TestCase, response: &ToolResponse) -> (TestStatus, String) {
    let content = match (response, test.expected_success) {
        (ToolResponse::Success(payload), true) => payload.clone(),
        (ToolResponse::Failure(error), false) => Payload::Text(error.clone()),
        (ToolResponse::Failure(error), true) => {
            return (
                TestStatus::Failed,
                format!("Expected success, got error: {}", error),
            );
        }
        (ToolResponse::Success(_), false) => {
            return (
                TestStatus::Failed,
                "Expected failure, but the call succeeded".to_string(),
            );
        }
    };

    match &test.validator {
        Some(validator) => {
            let verdict = validator.check(&content);
            let status = if verdict.passed {
                TestStatus::Passed
            } else {
                TestStatus::Failed
            };
            (status, verdict.message)
        }
        None if test.expected_success => (TestStatus::Passed, "Call succeeded".to_string()),
        None => (
            TestStatus::Passed,
            format!("Failed as expected: {}", content.string_form()),
        ),
    }
}
