//! Console and JSON output for plans and runs

use std::collections::BTreeMap;

use colored::Colorize;
use serde_json::{json, Value};

use crate::common::Result;

use super::model::{TestResult, TestStatus};
use super::runner::RunReport;
use super::suite::Suite;

/// Print the suite without running anything
pub fn print_plan(suite: &Suite) {
    println!("\n{} {}", "Test Plan:".blue().bold(), suite.name().white().bold());
    if let Some(desc) = suite.description() {
        println!("  {}", desc.dimmed());
    }
    println!("\n{} {}", "Total tests:".cyan(), suite.len());

    let mut tools: BTreeMap<&str, usize> = BTreeMap::new();
    for test in suite.tests() {
        *tools.entry(test.tool.as_str()).or_default() += 1;
    }
    println!("\n{}", "Tools:".cyan());
    for (tool, count) in &tools {
        let plural = if *count > 1 { "s" } else { "" };
        println!("  - {} ({} test{})", tool, count, plural);
    }

    if !suite.session().is_empty() {
        println!("\n{}", "Session resources:".cyan());
        for resource in suite.session() {
            println!("  - {} {}", resource.kind, resource.name);
        }
    }

    println!("\n{}", "Execution order:".cyan());
    for (i, test) in suite.tests().iter().enumerate() {
        println!("{:>3}. {}", i + 1, test.name.white().bold());
        println!("     Tool: {}", test.tool);
        let deps = test
            .depends_on
            .as_ref()
            .map(|d| format!(" [depends: {}]", d))
            .unwrap_or_default();
        println!("     Desc: {}{}", test.description, deps.dimmed());
        if !test.args.is_empty() {
            let args = serde_json::to_string_pretty(&test.args).unwrap_or_default();
            println!("     Args: {}", args.replace('\n', "\n     "));
        }
        if let Some(validator) = &test.validator {
            println!("     Check: {}", validator.label());
        }
        if !test.expected_success {
            println!("     {}", "Expects failure".yellow());
        }
    }
    println!();
}

/// Print each test as a replayable `<prefix><tool>(<json>)` line
pub fn print_commands(suite: &Suite, prefix: &str) {
    for (i, test) in suite.tests().iter().enumerate() {
        println!("# Test {}: {}", i + 1, test.name);
        if !test.description.is_empty() {
            println!("# {}", test.description);
        }
        println!("{}", test.replay().render(prefix));
        println!();
    }
}

pub fn print_header(suite: &Suite) {
    println!(
        "\n{} {}",
        "Running Suite:".blue().bold(),
        suite.name().white().bold()
    );
    if let Some(desc) = suite.description() {
        println!("  {}", desc.dimmed());
    }
    println!();
}

/// One line per result, plus the raw response when `verbose`
pub fn print_result(result: &TestResult, verbose: bool) {
    let mark = match result.status {
        TestStatus::Passed => "✓".green(),
        TestStatus::Failed => "✗".red(),
        TestStatus::Skipped => "-".yellow(),
        TestStatus::Pending | TestStatus::Running => "?".dimmed(),
    };
    println!(
        "  {} {} {} {}",
        mark,
        result.name,
        format!("({}ms)", result.duration.as_millis()).dimmed(),
        result.message.dimmed()
    );

    if verbose {
        if let Some(response) = &result.response {
            let raw = serde_json::to_string(response).unwrap_or_default();
            println!("      {}", raw.dimmed());
        }
    }
}

pub fn print_summary(report: &RunReport) {
    let summary = report.summary();
    let line = format!(
        "{} passed, {} failed, {} skipped ({} total) in {:.1}s",
        summary.passed,
        summary.failed,
        summary.skipped,
        summary.total,
        report.duration.as_secs_f64()
    );

    if summary.failed == 0 {
        println!("\n{} {}\n", "✓".green().bold(), line.green().bold());
    } else {
        println!("\n{} {}", "✗".red().bold(), line.red().bold());
        for result in report.results.iter().filter(|r| r.is_failed()) {
            println!("  {} {}: {}", "✗".red(), result.name, result.message);
        }
        println!();
    }
}

/// Machine-readable report: suite name, summary and every result
pub fn to_json(report: &RunReport) -> Result<String> {
    let value: Value = json!({
        "suite": report.suite,
        "summary": report.summary(),
        "duration_ms": report.duration.as_millis() as u64,
        "results": report.results,
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::ToolResponse;
    use crate::testing::model::TestCase;
    use std::time::Duration;

    #[test]
    fn test_json_report() {
        let test = TestCase::new("open", "open_project", "");
        let report = RunReport {
            suite: "unit".to_string(),
            results: vec![
                TestResult {
                    name: "create".to_string(),
                    tool: "create_project".to_string(),
                    status: TestStatus::Failed,
                    message: "Expected success, got error: boom".to_string(),
                    duration: Duration::from_millis(12),
                    response: Some(ToolResponse::failure("boom")),
                },
                TestResult::skipped(&test, "Dependency 'create' failed"),
            ],
            duration: Duration::from_millis(20),
        };

        let value: Value = serde_json::from_str(&to_json(&report).unwrap()).unwrap();
        assert_eq!(value["suite"], json!("unit"));
        assert_eq!(value["summary"]["failed"], json!(1));
        assert_eq!(value["summary"]["skipped"], json!(1));
        assert_eq!(value["results"][0]["duration_ms"], json!(12));
        assert_eq!(value["results"][0]["response"]["error"], json!("boom"));
        assert_eq!(value["results"][1]["status"], json!("skipped"));
    }
}
