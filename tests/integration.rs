//! End-to-end integration tests for the harness
//!
//! These tests drive the `mock_tool_server` binary over real pipes:
//! 1. Transport behavior (id sequencing, decoding, timeouts, restarts)
//! 2. Suites and resource scopes against a stateful server
//! 3. The `mcp-harness` CLI itself

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;

use harness::common::config::ServerConfig;
use harness::testing::{
    self, builtin, ResourceManager, ResourceNamer, ResourceSpec, RunOptions, Suite, TestCase,
    TestStatus, Validator,
};
use harness::{Error, Payload, ToolCaller, ToolClient, ToolResponse};

const CALL: Duration = Duration::from_secs(10);

fn mock_server() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mock_tool_server"))
}

fn harness_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mcp-harness"))
}

fn mock_config() -> ServerConfig {
    ServerConfig {
        command: mock_server().display().to_string(),
        args: Vec::new(),
        warmup_ms: 0,
        stop_timeout_secs: 2,
        ..Default::default()
    }
}

async fn started(config: ServerConfig) -> ToolClient {
    let mut client = ToolClient::new(config);
    client.start().await.expect("Failed to start mock server");
    client
}

fn args(value: Value) -> Map<String, Value> {
    testing::into_object(value)
}

// ============== Transport ==============

#[tokio::test]
async fn test_request_ids_are_sequential() {
    let mut client = started(mock_config()).await;

    for expected in 1..=3u64 {
        let response = client
            .call_tool("echo", args(json!({"n": expected})), CALL)
            .await
            .unwrap();
        assert_eq!(
            response,
            ToolResponse::Success(Payload::Structured(json!({"n": expected})))
        );
        assert_eq!(client.last_request_id(), expected);
    }

    client.stop().await.unwrap();
}

#[tokio::test]
async fn test_error_object_becomes_failure() {
    let mut client = started(mock_config()).await;

    let response = client
        .call_tool("fail", args(json!({"message": "boom"})), CALL)
        .await
        .unwrap();
    assert_eq!(response, ToolResponse::failure("boom"));
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"success": false, "content": null, "error": "boom"})
    );

    client.stop().await.unwrap();
}

#[tokio::test]
async fn test_plain_text_is_kept_verbatim() {
    let mut client = started(mock_config()).await;

    let response = client
        .call_tool("reload_selectors", Map::new(), CALL)
        .await
        .unwrap();
    assert_eq!(
        response,
        ToolResponse::Success(Payload::Text("Selectors reloaded from config".to_string()))
    );

    client.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_twice() {
    let mut client = started(mock_config()).await;
    assert!(client.is_running());

    client.stop().await.unwrap();
    client.stop().await.unwrap();
    assert!(!client.is_started());

    let err = client
        .call_tool("echo", Map::new(), CALL)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotStarted));
}

#[tokio::test]
async fn test_launch_environment() {
    let mut client = started(ServerConfig {
        headed: true,
        slow_mo_ms: 250,
        ..mock_config()
    })
    .await;

    let response = client.call_tool("get_page_info", Map::new(), CALL).await.unwrap();
    let info = response.content().and_then(Payload::as_object).unwrap().clone();
    assert_eq!(info["headed"], json!(true));
    assert_eq!(info["slow_mo"], json!("250"));

    client.stop().await.unwrap();
}

#[tokio::test]
async fn test_timeout_restarts_server() {
    let mut client = started(mock_config()).await;

    let response = client
        .call_tool("sleep", args(json!({"ms": 3000})), Duration::from_millis(200))
        .await
        .unwrap();
    let error = response.error().unwrap();
    assert!(error.contains("Timed out"), "unexpected error: {}", error);

    // Fresh server, ids keep counting
    let response = client
        .call_tool("echo", args(json!({"after": "restart"})), CALL)
        .await
        .unwrap();
    assert!(response.is_success());
    assert_eq!(client.last_request_id(), 2);

    client.stop().await.unwrap();
}

#[tokio::test]
async fn test_timeout_without_restart_desynchronises() {
    let mut client = started(ServerConfig {
        restart_on_timeout: false,
        ..mock_config()
    })
    .await;

    let response = client
        .call_tool("sleep", args(json!({"ms": 500})), Duration::from_millis(50))
        .await
        .unwrap();
    assert!(!response.is_success());

    // The late reply to the abandoned call arrives in place of this one
    let response = client.call_tool("echo", Map::new(), CALL).await.unwrap();
    let error = response.error().unwrap();
    assert!(error.contains("ID mismatch"), "unexpected error: {}", error);

    client.stop().await.unwrap();
}

#[tokio::test]
async fn test_cancellation() {
    let mut client = started(mock_config()).await;
    let token = CancellationToken::new();

    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let response = client
        .call_tool_cancellable("sleep", args(json!({"ms": 5000})), CALL, Some(&token))
        .await
        .unwrap();
    assert_eq!(response, ToolResponse::failure("Call was cancelled"));

    let response = client.call_tool("echo", Map::new(), CALL).await.unwrap();
    assert!(response.is_success());

    client.stop().await.unwrap();
}

#[tokio::test]
async fn test_server_exit_is_failure_and_recovers() {
    let mut client = started(mock_config()).await;

    let response = client.call_tool("exit", Map::new(), CALL).await.unwrap();
    let error = response.error().unwrap();
    assert!(error.contains("closed"), "unexpected error: {}", error);

    let response = client.call_tool("echo", Map::new(), CALL).await.unwrap();
    assert!(response.is_success());

    client.stop().await.unwrap();
}

#[tokio::test]
async fn test_malformed_responses_are_failures() {
    let mut client = started(mock_config()).await;

    let response = client.call_tool("garbage", Map::new(), CALL).await.unwrap();
    assert!(response.error().unwrap().contains("Invalid JSON"));

    let response = client.call_tool("wrong_id", Map::new(), CALL).await.unwrap();
    assert!(response.error().unwrap().contains("ID mismatch"));

    client.stop().await.unwrap();
}

#[tokio::test]
async fn test_list_tools() {
    let mut client = started(mock_config()).await;

    let tools = client.list_tools(CALL).await.unwrap();
    assert_eq!(tools.len(), 20);
    assert!(tools.iter().any(|t| t.name == "delete_project"));
    assert!(tools.iter().all(|t| t.input_schema.is_some()));

    client.stop().await.unwrap();
}

#[tokio::test]
async fn test_list_tools_timeout_restarts_server() {
    let mut client = started(ServerConfig {
        args: vec!["--list-delay-ms".to_string(), "1000".to_string()],
        ..mock_config()
    })
    .await;

    let err = client
        .list_tools(Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));

    // The late tools/list reply went away with the old process
    let response = client
        .call_tool("echo", args(json!({"n": 2})), CALL)
        .await
        .unwrap();
    assert_eq!(
        response,
        ToolResponse::Success(Payload::Structured(json!({"n": 2})))
    );
    assert_eq!(client.last_request_id(), 2);

    client.stop().await.unwrap();
}

// ============== Suites and resources ==============

#[tokio::test]
async fn test_project_file_lifecycle() {
    let mut client = started(mock_config()).await;
    let namer = ResourceNamer::random();
    let project = namer.name("__e2e_project_");
    let file = format!("{}.md", namer.name("e2e_file_"));
    let content = "# Notes\n\nWritten by the end-to-end test.";

    let suite = Suite::new(
        "lifecycle",
        vec![
            TestCase::new("create", "create_project", "").args(json!({"name": project})),
            TestCase::new("open", "open_project", "")
                .args(json!({"project": project}))
                .validator(Validator::custom("open shape", |content| {
                    match content.as_object() {
                        Some(map)
                            if map.get("status") == Some(&json!("opened"))
                                && ["url", "conversations", "files"]
                                    .iter()
                                    .all(|k| map.contains_key(*k)) =>
                        {
                            testing::Verdict::pass("opened with url, conversations, files")
                        }
                        _ => testing::Verdict::fail("unexpected open_project shape"),
                    }
                }))
                .depends_on("create"),
            TestCase::new("create_file", "create_file", "")
                .args(json!({"project": project, "file_name": file, "content": content}))
                .validator(Validator::contains("created"))
                .depends_on("create"),
            TestCase::new("read_file", "read_file", "")
                .args(json!({"project": project, "file_name": file}))
                .validator(Validator::contains(content))
                .depends_on("create_file"),
            TestCase::new("delete_file", "delete_file", "")
                .args(json!({"project": project, "file_name": file}))
                .validator(Validator::contains("deleted"))
                .depends_on("create_file"),
            TestCase::new("delete_no_confirm", "delete_project", "")
                .args(json!({"project": project, "confirm": false}))
                .validator(Validator::contains("confirm"))
                .depends_on("create"),
            TestCase::new("still_there", "get_project_details", "")
                .args(json!({"project": project}))
                .validator(Validator::Dict)
                .depends_on("delete_no_confirm"),
            TestCase::new("delete", "delete_project", "")
                .args(json!({"project": project, "confirm": true}))
                .validator(Validator::contains("deleted"))
                .depends_on("create"),
        ],
    )
    .unwrap();

    let report = testing::run_suite(&mut client, &suite, &RunOptions::default(), |_| {})
        .await
        .unwrap();
    for result in &report.results {
        assert_eq!(
            result.status,
            TestStatus::Passed,
            "{}: {}",
            result.name,
            result.message
        );
    }

    let projects = client.call_tool("list_projects", Map::new(), CALL).await.unwrap();
    assert_eq!(projects.content(), Some(&Payload::Structured(json!([]))));

    client.stop().await.unwrap();
}

#[tokio::test]
async fn test_builtin_suite_against_mock() {
    let mut client = started(mock_config()).await;
    let suite = builtin::generated(&ResourceNamer::random()).unwrap();

    let report = testing::run_suite(&mut client, &suite, &RunOptions::default(), |_| {})
        .await
        .unwrap();

    let failed: Vec<_> = report.results.iter().filter(|r| r.is_failed()).collect();
    assert!(failed.is_empty(), "failures: {:?}", failed);
    assert_eq!(report.summary().passed, 25);
    assert_eq!(client.last_request_id(), 25);

    client.stop().await.unwrap();
}

#[tokio::test]
async fn test_failed_prerequisite_skips_dependents() {
    let mut client = started(mock_config()).await;

    let suite = Suite::new(
        "skips",
        vec![
            TestCase::new("open_missing", "open_project", "")
                .args(json!({"project": "__does_not_exist"})),
            TestCase::new("details", "get_project_details", "")
                .args(json!({"project": "__does_not_exist"}))
                .depends_on("open_missing"),
            TestCase::new("missing_expected", "open_project", "")
                .args(json!({"project": "__does_not_exist"}))
                .expect_failure()
                .validator(Validator::contains("not found")),
        ],
    )
    .unwrap();

    let report = testing::run_suite(&mut client, &suite, &RunOptions::default(), |_| {})
        .await
        .unwrap();

    assert_eq!(report.results[0].status, TestStatus::Failed);
    assert_eq!(report.results[1].status, TestStatus::Skipped);
    assert_eq!(report.results[2].status, TestStatus::Passed);
    // The skipped test never reached the server
    assert_eq!(client.last_request_id(), 2);

    client.stop().await.unwrap();
}

#[tokio::test]
async fn test_session_project_released() {
    let mut client = started(mock_config()).await;
    let manager = ResourceManager::new(ResourceNamer::random(), false);
    let name = manager.namer().name("__session_");
    let spec = ResourceSpec::project(&name, Some("Session project"));

    let url = manager
        .session(&mut client, std::slice::from_ref(&spec), CALL, |client, resources| {
            Box::pin(async move {
                let response = client
                    .call_tool("list_projects", Map::new(), CALL)
                    .await
                    .unwrap();
                assert_eq!(response.content().and_then(Payload::as_array).unwrap().len(), 1);
                resources[0].url.clone()
            })
        })
        .await
        .unwrap();

    assert!(url.unwrap().starts_with("https://claude.ai/project/"));

    let response = client.call_tool("list_projects", Map::new(), CALL).await.unwrap();
    assert_eq!(response.content(), Some(&Payload::Structured(json!([]))));

    client.stop().await.unwrap();
}

#[tokio::test]
async fn test_per_test_file_released_after_failure() {
    let mut client = started(mock_config()).await;
    let manager = ResourceManager::default();
    client
        .call_tool("create_project", args(json!({"name": "host"})), CALL)
        .await
        .unwrap();

    let spec = ResourceSpec::file("host", "scratch.md", "temporary");
    let outcome = manager
        .per_test(&mut client, &spec, CALL, |client, _| {
            Box::pin(async move { client.call_tool("fail", Map::new(), CALL).await })
        })
        .await
        .unwrap()
        .unwrap();
    assert!(!outcome.is_success());

    let files = client
        .call_tool("list_project_files", args(json!({"project": "host"})), CALL)
        .await
        .unwrap();
    assert_eq!(files.content(), Some(&Payload::Structured(json!([]))));

    client.stop().await.unwrap();
}

// ============== CLI ==============

fn write_config(dir: &std::path::Path) -> PathBuf {
    let path = dir.join("config.toml");
    let config = format!(
        "[server]\ncommand = {:?}\nargs = []\nwarmup_ms = 0\nstop_timeout_secs = 2\n\n[timeouts]\ncall_secs = 10\n",
        mock_server().display().to_string()
    );
    std::fs::write(&path, config).expect("Failed to write config");
    path
}

#[test]
fn test_cli_run_builtin_suite() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let output = Command::new(harness_bin())
        .args(["run", "--json", "--config"])
        .arg(&config)
        .output()
        .expect("Failed to run mcp-harness");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["summary"]["passed"], json!(25));
    assert_eq!(report["summary"]["failed"], json!(0));
}

#[test]
fn test_cli_run_failing_suite_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let suite = dir.path().join("suite.yaml");
    std::fs::write(
        &suite,
        r#"
name: Failing
names:
  project: "__cli_"
session:
  - kind: project
    name: "${project}"
tests:
  - name: test_open
    tool: open_project
    args: { project: "${project}" }
    validator: project_opened
  - name: test_bad
    tool: fail
    args: { message: "broken on purpose" }
  - name: test_after_bad
    tool: echo
    depends_on: test_bad
"#,
    )
    .unwrap();

    let output = Command::new(harness_bin())
        .args(["run", "--json", "--config"])
        .arg(&config)
        .arg(&suite)
        .output()
        .expect("Failed to run mcp-harness");

    assert_eq!(output.status.code(), Some(1));
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["summary"]["passed"], json!(1));
    assert_eq!(report["summary"]["failed"], json!(1));
    assert_eq!(report["summary"]["skipped"], json!(1));
    assert_eq!(
        report["results"][1]["message"],
        json!("Expected success, got error: broken on purpose")
    );
}

#[test]
fn test_cli_run_suite_with_contains_validator() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let suite = dir.path().join("suite.yaml");
    std::fs::write(
        &suite,
        r##"
name: Files
names:
  project: "__cli_files_"
session:
  - kind: project
    name: "${project}"
tests:
  - name: test_create_file
    tool: create_file
    args: { project: "${project}", file_name: notes.md, content: "# Test File" }
    validator:
      contains: created
  - name: test_read_file
    tool: read_file
    depends_on: test_create_file
    args: { project: "${project}", file_name: notes.md }
    validator: { contains: "test file" }
  - name: test_read_missing_file
    tool: read_file
    expected_success: false
    args: { project: "${project}", file_name: missing.md }
    validator:
      contains: not found
"##,
    )
    .unwrap();

    let output = Command::new(harness_bin())
        .args(["run", "--json", "--config"])
        .arg(&config)
        .arg(&suite)
        .output()
        .expect("Failed to run mcp-harness");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["summary"]["passed"], json!(3));
    assert_eq!(
        report["results"][0]["message"],
        json!("Response contains 'created'")
    );
}

#[test]
fn test_cli_commands_replay() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let output = Command::new(harness_bin())
        .args(["commands", "--prefix", "mcp__srv__", "--config"])
        .arg(&config)
        .output()
        .expect("Failed to run mcp-harness");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("# Test 1: test_get_page_info"));
    assert!(stdout.contains("mcp__srv__get_page_info()"));
    assert!(stdout.contains(r#"mcp__srv__get_selectors({"category":"chat"})"#));
    assert!(stdout.contains("mcp__srv__delete_project({"));
}
