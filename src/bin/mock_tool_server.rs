//! Mock tool server binary for integration testing
//!
//! Speaks line-delimited JSON-RPC on stdin/stdout and keeps projects, files
//! and conversations in memory, so suites can run without a browser or a
//! real account. A few extra tools (`sleep`, `fail`, `exit`, `garbage`)
//! exist only to provoke transport faults. `--list-delay-ms N` makes
//! `tools/list` answer late.

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::time::Duration;

fn main() {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut reader = BufReader::new(stdin.lock());
    let mut writer = stdout.lock();

    let mut state = MockState {
        list_delay: list_delay_arg(),
        ..Default::default()
    };
    eprintln!("mock_tool_server: ready");

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let message: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(_) => continue,
        };

        match state.process_message(&message) {
            Reply::Message(response) => send_line(&mut writer, &response.to_string()),
            Reply::Raw(text) => send_line(&mut writer, &text),
            Reply::Exit => break,
        }
    }
}

fn list_delay_arg() -> Option<Duration> {
    let args: Vec<String> = std::env::args().collect();
    args.iter()
        .position(|a| a == "--list-delay-ms")
        .and_then(|i| args.get(i + 1))
        .and_then(|ms| ms.parse().ok())
        .map(Duration::from_millis)
}

fn send_line<W: Write>(writer: &mut W, line: &str) {
    writer.write_all(line.as_bytes()).ok();
    writer.write_all(b"\n").ok();
    writer.flush().ok();
}

enum Reply {
    Message(Value),
    Raw(String),
    Exit,
}

/// What a tool produced
enum Outcome {
    Json(Value),
    Text(String),
    Error(String),
}

struct Project {
    id: String,
    instructions: String,
    files: BTreeMap<String, String>,
    conversations: Vec<String>,
}

#[derive(Default)]
struct MockState {
    projects: BTreeMap<String, Project>,
    next_id: u64,
    last_response: Option<String>,
    list_delay: Option<Duration>,
}

impl MockState {
    fn process_message(&mut self, message: &Value) -> Reply {
        let id = message.get("id").cloned().unwrap_or(Value::Null);
        let method = message.get("method").and_then(Value::as_str).unwrap_or("");
        let params = message.get("params").cloned().unwrap_or(json!({}));

        let outcome = match method {
            "tools/list" => {
                if let Some(delay) = self.list_delay {
                    std::thread::sleep(delay);
                }
                return Reply::Message(respond(id, json!({ "tools": tool_list() })));
            }
            "tools/call" => {
                let name = params.get("name").and_then(Value::as_str).unwrap_or("");
                let args = params
                    .get("arguments")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                match name {
                    "exit" => return Reply::Exit,
                    "garbage" => return Reply::Raw("this is not json".to_string()),
                    "wrong_id" => {
                        let bogus = id.as_u64().map(|n| n + 1000).unwrap_or(0);
                        return Reply::Message(respond(json!(bogus), text_result("ok")));
                    }
                    _ => self.call_tool(name, &args),
                }
            }
            other => Outcome::Error(format!("Method not found: {}", other)),
        };

        Reply::Message(match outcome {
            Outcome::Json(value) => respond(id, text_result(&value.to_string())),
            Outcome::Text(text) => respond(id, text_result(&text)),
            Outcome::Error(message) => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32000, "message": message }
            }),
        })
    }

    fn call_tool(&mut self, name: &str, args: &Map<String, Value>) -> Outcome {
        let arg = |key: &str| args.get(key).and_then(Value::as_str).unwrap_or("").to_string();

        match name {
            "get_page_info" => Outcome::Json(json!({
                "url": "https://claude.ai/projects",
                "title": "Projects",
                "headed": std::env::var("HEADED").map(|v| v == "true").unwrap_or(false),
                "slow_mo": std::env::var("SLOW_MO").ok(),
            })),
            "get_selectors" => match args.get("category").and_then(Value::as_str) {
                None => Outcome::Json(json!({
                    "chat": { "input": "div[contenteditable]", "send": "button[aria-label='Send']" },
                    "project": { "list": "a[href^='/project/']" }
                })),
                Some("chat") => Outcome::Json(json!({
                    "input": "div[contenteditable]",
                    "send": "button[aria-label='Send']"
                })),
                Some(other) => Outcome::Error(format!("Unknown selector category: {}", other)),
            },
            "reload_selectors" => Outcome::Text("Selectors reloaded from config".to_string()),
            "validate_selectors" => Outcome::Json(json!({ "valid": 3, "invalid": [] })),
            "take_screenshot" => {
                let label = arg("label");
                Outcome::Json(json!({
                    "path": format!("/tmp/screenshots/{}.png", label),
                    "message": format!("Saved screenshot '{}'", label),
                    "full_page": args.get("full_page").and_then(Value::as_bool).unwrap_or(false),
                }))
            }

            "list_projects" => Outcome::Json(Value::Array(
                self.projects
                    .iter()
                    .map(|(name, p)| json!({ "name": name, "id": p.id }))
                    .collect(),
            )),
            "create_project" => {
                let name = arg("name");
                if name.is_empty() {
                    return Outcome::Error("Missing project name".to_string());
                }
                if self.projects.contains_key(&name) {
                    return Outcome::Error(format!("Project '{}' already exists", name));
                }
                self.next_id += 1;
                let id = format!("proj-{}", self.next_id);
                self.projects.insert(
                    name.clone(),
                    Project {
                        id: id.clone(),
                        instructions: arg("instructions"),
                        files: BTreeMap::new(),
                        conversations: Vec::new(),
                    },
                );
                Outcome::Json(json!({
                    "id": id,
                    "name": name,
                    "url": format!("https://claude.ai/project/{}", id),
                }))
            }
            "open_project" => match self.projects.get(&arg("project")) {
                Some(p) => Outcome::Json(json!({
                    "status": "opened",
                    "url": format!("https://claude.ai/project/{}", p.id),
                    "conversations": p.conversations,
                    "files": p.files.keys().collect::<Vec<_>>(),
                })),
                None => not_found(&arg("project")),
            },
            "get_project_details" => match self.projects.get(&arg("project")) {
                Some(p) => Outcome::Json(json!({
                    "id": p.id,
                    "name": arg("project"),
                    "instructions": p.instructions,
                    "files": p.files.keys().collect::<Vec<_>>(),
                    "conversation_count": p.conversations.len(),
                })),
                None => not_found(&arg("project")),
            },
            "get_project_memory" => match self.projects.get(&arg("project")) {
                Some(_) => Outcome::Text(format!("No memory recorded for {}", arg("project"))),
                None => not_found(&arg("project")),
            },
            "get_project_instructions" => match self.projects.get(&arg("project")) {
                Some(p) => Outcome::Text(p.instructions.clone()),
                None => not_found(&arg("project")),
            },
            "set_project_instructions" => match self.projects.get_mut(&arg("project")) {
                Some(p) => {
                    p.instructions = arg("instructions");
                    Outcome::Text("Instructions updated".to_string())
                }
                None => not_found(&arg("project")),
            },
            "delete_project" => {
                let name = arg("project");
                if !self.projects.contains_key(&name) {
                    return not_found(&name);
                }
                if args.get("confirm").and_then(Value::as_bool) != Some(true) {
                    return Outcome::Text(
                        "Refusing to delete without confirm=true".to_string(),
                    );
                }
                self.projects.remove(&name);
                Outcome::Text(format!("Project '{}' deleted", name))
            }

            "list_project_files" => match self.projects.get(&arg("project")) {
                Some(p) => Outcome::Json(Value::Array(
                    p.files
                        .iter()
                        .map(|(name, content)| json!({ "name": name, "size": content.len() }))
                        .collect(),
                )),
                None => not_found(&arg("project")),
            },
            "create_file" => match self.projects.get_mut(&arg("project")) {
                Some(p) => {
                    let file_name = arg("file_name");
                    p.files.insert(file_name.clone(), arg("content"));
                    Outcome::Text(format!("File '{}' created", file_name))
                }
                None => not_found(&arg("project")),
            },
            "read_file" => match self
                .projects
                .get(&arg("project"))
                .and_then(|p| p.files.get(&arg("file_name")))
            {
                Some(content) => Outcome::Text(content.clone()),
                None => Outcome::Error(format!("File not found: {}", arg("file_name"))),
            },
            "delete_file" => match self
                .projects
                .get_mut(&arg("project"))
                .and_then(|p| p.files.remove(&arg("file_name")))
            {
                Some(_) => Outcome::Text(format!("File '{}' deleted", arg("file_name"))),
                None => Outcome::Error(format!("File not found: {}", arg("file_name"))),
            },

            "send_message" => {
                self.next_id += 1;
                let conversation = format!("conv-{}", self.next_id);
                if let Some(p) = self.projects.get_mut(&arg("project")) {
                    p.conversations.push(conversation.clone());
                }
                self.last_response = Some("HELLO".to_string());
                Outcome::Json(json!({ "conversation_id": conversation, "response": "HELLO" }))
            }
            "get_response" => match &self.last_response {
                Some(text) => Outcome::Text(text.clone()),
                None => Outcome::Error("No response available".to_string()),
            },
            "list_conversations" => match self.projects.get(&arg("project")) {
                Some(p) => Outcome::Json(json!(p.conversations)),
                None => not_found(&arg("project")),
            },

            "echo" => Outcome::Json(Value::Object(args.clone())),
            "empty" => Outcome::Text(String::new()),
            "sleep" => {
                let ms = args.get("ms").and_then(Value::as_u64).unwrap_or(1000);
                std::thread::sleep(Duration::from_millis(ms));
                Outcome::Text("slept".to_string())
            }
            "fail" => {
                let message = args.get("message").and_then(Value::as_str).unwrap_or("boom");
                Outcome::Error(message.to_string())
            }
            other => Outcome::Error(format!("Unknown tool: {}", other)),
        }
    }
}

fn not_found(project: &str) -> Outcome {
    Outcome::Error(format!("Project not found: {}", project))
}

fn respond(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn text_result(text: &str) -> Value {
    json!({ "content": [{ "type": "text", "text": text }] })
}

fn tool_list() -> Vec<Value> {
    [
        ("list_projects", "List all projects"),
        ("create_project", "Create a project"),
        ("open_project", "Open a project"),
        ("delete_project", "Delete a project (requires confirm=true)"),
        ("get_project_details", "Get project details"),
        ("get_project_memory", "Get project memory"),
        ("get_project_instructions", "Get project instructions"),
        ("set_project_instructions", "Set project instructions"),
        ("list_project_files", "List knowledge base files"),
        ("create_file", "Create a text file"),
        ("read_file", "Read a file"),
        ("delete_file", "Delete a file"),
        ("send_message", "Send a chat message"),
        ("get_response", "Get the last response"),
        ("list_conversations", "List conversations"),
        ("take_screenshot", "Take a screenshot"),
        ("validate_selectors", "Validate selectors"),
        ("reload_selectors", "Reload selectors"),
        ("get_selectors", "Get selectors"),
        ("get_page_info", "Get page info"),
    ]
    .iter()
    .map(|(name, description)| {
        json!({
            "name": name,
            "description": description,
            "inputSchema": { "type": "object" }
        })
    })
    .collect()
}
