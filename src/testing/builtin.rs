//! Built-in suite covering the Claude project tool server
//!
//! Runs the utility tools first as a connectivity check, then walks a
//! throwaway project through create, inspect, file round trip, chat and
//! deletion.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;

use crate::common::Result;

use super::model::TestCase;
use super::resources::ResourceNamer;
use super::suite::Suite;
use super::validators::Validator;

pub const SUITE_NAME: &str = "Claude project tool server";
pub const PROJECT_PREFIX: &str = "__mcp_integration_test_";
pub const FILE_PREFIX: &str = "test_file_";
pub const FILE_CONTENT: &str = "# Test File\n\nCreated by MCP integration tests.\n\nLine 4.";

/// Built-in suite with freshly generated project and file names
pub fn generated(namer: &ResourceNamer) -> Result<Suite> {
    let project = namer.name(PROJECT_PREFIX);
    let file = format!("{}.md", namer.name(FILE_PREFIX));
    suite(&project, &file)
}

/// Built-in suite against the given project and file names
pub fn suite(project: &str, file: &str) -> Result<Suite> {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let tests = vec![
        // Utility
        TestCase::new("test_get_page_info", "get_page_info", "Get current browser page state")
            .validator(Validator::Dict),
        TestCase::new("test_get_selectors", "get_selectors", "Get selector configuration")
            .validator(Validator::Dict),
        TestCase::new(
            "test_get_selectors_category",
            "get_selectors",
            "Get selectors for specific category",
        )
        .args(json!({"category": "chat"})),
        TestCase::new(
            "test_reload_selectors",
            "reload_selectors",
            "Reload selectors from config file",
        )
        .validator(Validator::contains("reload")),
        // Projects
        TestCase::new("test_list_projects", "list_projects", "List all existing projects")
            .validator(Validator::List),
        TestCase::new("test_create_project", "create_project", "Create a new test project").args(
            json!({
                "name": project,
                "instructions": "This is an automated test project. It will be deleted.",
            }),
        ),
        TestCase::new("test_open_project", "open_project", "Open the test project")
            .args(json!({"project": project}))
            .validator(Validator::ProjectOpened)
            .depends_on("test_create_project"),
        TestCase::new(
            "test_get_project_details",
            "get_project_details",
            "Get full project details",
        )
        .args(json!({"project": project}))
        .validator(Validator::Dict)
        .depends_on("test_create_project"),
        TestCase::new(
            "test_get_project_memory",
            "get_project_memory",
            "Get project memory/context",
        )
        .args(json!({"project": project}))
        .depends_on("test_create_project"),
        TestCase::new(
            "test_get_project_instructions",
            "get_project_instructions",
            "Get project custom instructions",
        )
        .args(json!({"project": project}))
        .validator(Validator::contains("test"))
        .depends_on("test_create_project"),
        TestCase::new(
            "test_set_project_instructions",
            "set_project_instructions",
            "Update project instructions",
        )
        .args(json!({
            "project": project,
            "instructions": format!("Updated instructions at {}. Be brief.", stamp),
        }))
        .validator(Validator::contains("updated"))
        .depends_on("test_create_project"),
        // Files
        TestCase::new(
            "test_list_project_files_empty",
            "list_project_files",
            "List files in project (initially empty)",
        )
        .args(json!({"project": project}))
        .validator(Validator::List)
        .depends_on("test_create_project"),
        TestCase::new(
            "test_create_file",
            "create_file",
            "Create a new text file in knowledge base",
        )
        .args(json!({"project": project, "file_name": file, "content": FILE_CONTENT}))
        .validator(Validator::contains("created"))
        .depends_on("test_create_project"),
        TestCase::new(
            "test_list_project_files_with_file",
            "list_project_files",
            "List files after creating one",
        )
        .args(json!({"project": project}))
        .validator(Validator::List)
        .depends_on("test_create_file"),
        TestCase::new("test_read_file", "read_file", "Read content of created file")
            .args(json!({"project": project, "file_name": file}))
            .validator(Validator::contains("Test File"))
            .depends_on("test_create_file"),
        TestCase::new("test_delete_file", "delete_file", "Delete the test file")
            .args(json!({"project": project, "file_name": file}))
            .validator(Validator::contains("deleted"))
            .depends_on("test_create_file"),
        // Chat
        TestCase::new("test_send_message", "send_message", "Send a message in the project")
            .args(json!({
                "project": project,
                "message": "Please respond with exactly one word: HELLO",
                "wait_for_response": true,
            }))
            .validator(Validator::NotEmpty)
            .depends_on("test_create_project"),
        TestCase::new("test_get_response", "get_response", "Get the last response")
            .validator(Validator::NotEmpty)
            .depends_on("test_send_message"),
        TestCase::new(
            "test_list_conversations",
            "list_conversations",
            "List conversations in project",
        )
        .args(json!({"project": project}))
        .validator(Validator::List)
        .depends_on("test_send_message"),
        // Screenshots
        TestCase::new("test_take_screenshot", "take_screenshot", "Take a screenshot")
            .args(json!({"label": "integration_test"}))
            .validator(Validator::contains("screenshot")),
        TestCase::new(
            "test_take_screenshot_fullpage",
            "take_screenshot",
            "Take a full page screenshot",
        )
        .args(json!({"label": "integration_test_full", "full_page": true}))
        .validator(Validator::contains("screenshot")),
        // Selector validation
        TestCase::new(
            "test_validate_selectors",
            "validate_selectors",
            "Validate all selectors on current page",
        ),
        TestCase::new(
            "test_validate_selectors_category",
            "validate_selectors",
            "Validate chat selectors specifically",
        )
        .args(json!({"category": "chat"})),
        // Teardown
        TestCase::new(
            "test_delete_project_no_confirm",
            "delete_project",
            "Delete should refuse without confirmation",
        )
        .args(json!({"project": project, "confirm": false}))
        .validator(Validator::contains("confirm"))
        .depends_on("test_create_project"),
        TestCase::new("test_delete_project", "delete_project", "Delete the test project")
            .args(json!({"project": project, "confirm": true}))
            .validator(Validator::contains("deleted"))
            .depends_on("test_create_project"),
    ];

    Ok(Suite::new(SUITE_NAME, tests)?
        .with_description(format!("Test project: {}, test file: {}", project, file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_builtin_suite_is_valid() {
        let namer = ResourceNamer::with_suffix_fn(|| "0123abcd".to_string());
        let suite = generated(&namer).unwrap();
        assert_eq!(suite.len(), 25);

        let create = suite.get("test_create_project").unwrap();
        assert_eq!(create.args["name"], json!("__mcp_integration_test_0123abcd"));
        let read = suite.get("test_read_file").unwrap();
        assert_eq!(read.args["file_name"], json!("test_file_0123abcd.md"));
    }

    #[test]
    fn test_builtin_covers_tools() {
        let suite = suite("p", "f.md").unwrap();
        let tools: BTreeSet<&str> = suite.tests().iter().map(|t| t.tool.as_str()).collect();
        assert_eq!(tools.len(), 20);
        assert!(tools.contains("delete_project"));
        assert!(tools.contains("validate_selectors"));
    }

    #[test]
    fn test_delete_is_last() {
        let suite = suite("p", "f.md").unwrap();
        let last = suite.tests().last().unwrap();
        assert_eq!(last.name, "test_delete_project");
        assert_eq!(last.args["confirm"], json!(true));
    }
}
