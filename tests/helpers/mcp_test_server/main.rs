//! MCP test server binary for integration tests
//!
//! This binary implements a minimal MCP server that communicates over
//! stdin/stdout using newline-delimited JSON (the stdio transport protocol).
//! It is used exclusively by integration tests to exercise the stdio
//! transport, the client facade, the agent loop, and the CLI without
//! requiring a real external MCP server.
//!
//! # Handled Methods
//!
//! - `initialize` -- responds with protocol version `2024-11-05`.
//! - `notifications/initialized` -- acknowledged silently (no response).
//! - `tools/list` -- `echo`, `fail`, `crash`, and the two database tools.
//! - `tools/call`:
//!   - `echo` answers `"echo executed"`
//!   - `fail` answers with `isError: true`
//!   - `crash` exits the process without answering
//!   - `list_database_connections` / `select_database_connection` answer
//!     with JSON text payloads over two fixed connections
//! - `resources/list`, `resources/read` -- one text resource.
//! - `prompts/list`, `prompts/get` -- one prompt, `explain_table`.
//! - All other methods -- returns a JSON-RPC `-32601 Method not found` error.
//!
//! Before answering `tools/list` the server also writes a
//! `notifications/tools/list_changed` line, which clients must skip.

use std::io::{self, BufRead, Write};

use serde_json::{json, Value};

const RESOURCE_URI: &str = "pg://system_info";

fn main() {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut current_db = "primary".to_string();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let request: Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(_) => {
                // Malformed JSON: send a parse error and continue.
                let response = make_error(&Value::Null, -32700, "Parse error");
                if !send(&mut out, &response) {
                    break;
                }
                continue;
            }
        };

        let method = request.get("method").and_then(|m| m.as_str()).unwrap_or("");
        let id = request.get("id").cloned().unwrap_or(Value::Null);

        if method == "notifications/initialized" {
            continue;
        }

        let response = match method {
            "initialize" => handle_initialize(&id),
            "tools/list" => {
                let notice = json!({
                    "jsonrpc": "2.0",
                    "method": "notifications/tools/list_changed"
                });
                if !send(&mut out, &notice) {
                    break;
                }
                handle_tools_list(&id)
            }
            "tools/call" => match handle_tools_call(&id, &request, &mut current_db) {
                Some(response) => response,
                None => std::process::exit(3),
            },
            "resources/list" => handle_resources_list(&id),
            "resources/read" => handle_resources_read(&id, &request),
            "prompts/list" => handle_prompts_list(&id),
            "prompts/get" => handle_prompts_get(&id, &request),
            _ => make_error(&id, -32601, &format!("Method not found: {}", method)),
        };

        if !send(&mut out, &response) {
            break;
        }
    }
}

fn send(out: &mut impl Write, value: &Value) -> bool {
    let serialized = match serde_json::to_string(value) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("mcp_test_server: failed to serialize response: {}", e);
            return true;
        }
    };
    writeln!(out, "{}", serialized).is_ok() && out.flush().is_ok()
}

fn ok(id: &Value, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

fn text_result(text: &str, is_error: bool) -> Value {
    json!({
        "content": [{"type": "text", "text": text}],
        "isError": is_error
    })
}

fn handle_initialize(id: &Value) -> Value {
    eprintln!("mcp_test_server: initialize");
    ok(
        id,
        json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {"tools": {}, "resources": {}, "prompts": {}},
            "serverInfo": {"name": "mcp-test-server", "version": "0.1.0"}
        }),
    )
}

fn handle_tools_list(id: &Value) -> Value {
    let object = json!({"type": "object"});
    ok(
        id,
        json!({
            "tools": [
                {
                    "name": "echo",
                    "description": "Echoes input",
                    "inputSchema": {
                        "type": "object",
                        "properties": {"text": {"type": "string"}}
                    }
                },
                {"name": "fail", "description": "Always fails", "inputSchema": object},
                {"name": "crash", "description": "Exits the server", "inputSchema": object},
                {
                    "name": "list_database_connections",
                    "description": "Lists database connections",
                    "inputSchema": object
                },
                {
                    "name": "select_database_connection",
                    "description": "Selects the active database connection",
                    "inputSchema": {
                        "type": "object",
                        "properties": {"name": {"type": "string"}},
                        "required": ["name"]
                    }
                }
            ]
        }),
    )
}

/// Returns `None` when the server should exit without answering.
fn handle_tools_call(id: &Value, request: &Value, current_db: &mut String) -> Option<Value> {
    let params = request.get("params").unwrap_or(&Value::Null);
    let tool_name = params.get("name").and_then(|n| n.as_str()).unwrap_or("");
    let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

    let response = match tool_name {
        "echo" => ok(id, text_result("echo executed", false)),
        "fail" => ok(id, text_result("tool failed on purpose", true)),
        "crash" => return None,
        "list_database_connections" => {
            let payload = json!({
                "databases": [
                    {
                        "name": "primary",
                        "host": "localhost",
                        "port": 5432,
                        "database": "app",
                        "user": "postgres",
                        "sslmode": "disable"
                    },
                    {
                        "name": "analytics",
                        "host": "analytics.internal",
                        "port": 5433,
                        "database": "warehouse",
                        "user": "reader",
                        "sslmode": "require"
                    }
                ],
                "current": current_db.as_str()
            });
            ok(id, text_result(&payload.to_string(), false))
        }
        "select_database_connection" => {
            let name = arguments.get("name").and_then(|n| n.as_str()).unwrap_or("");
            let payload = if name == "primary" || name == "analytics" {
                *current_db = name.to_string();
                json!({
                    "success": true,
                    "current": name,
                    "message": format!("Switched to {}", name)
                })
            } else {
                json!({
                    "success": false,
                    "error": format!("unknown connection: {}", name)
                })
            };
            ok(id, text_result(&payload.to_string(), false))
        }
        _ => make_error(id, -32602, &format!("Unknown tool: {}", tool_name)),
    };
    Some(response)
}

fn handle_resources_list(id: &Value) -> Value {
    ok(
        id,
        json!({
            "resources": [{
                "uri": RESOURCE_URI,
                "name": "System information",
                "description": "Server version and settings",
                "mimeType": "text/plain"
            }]
        }),
    )
}

fn handle_resources_read(id: &Value, request: &Value) -> Value {
    let uri = request
        .get("params")
        .and_then(|p| p.get("uri"))
        .and_then(|u| u.as_str())
        .unwrap_or("");
    if uri != RESOURCE_URI {
        return make_error(id, -32602, &format!("Unknown resource: {}", uri));
    }
    ok(
        id,
        json!({
            "contents": [{
                "uri": RESOURCE_URI,
                "mimeType": "text/plain",
                "text": "PostgreSQL 16.2"
            }]
        }),
    )
}

fn handle_prompts_list(id: &Value) -> Value {
    ok(
        id,
        json!({
            "prompts": [{
                "name": "explain_table",
                "description": "Explain what a table holds",
                "arguments": [{"name": "table", "required": true}]
            }]
        }),
    )
}

fn handle_prompts_get(id: &Value, request: &Value) -> Value {
    let params = request.get("params").unwrap_or(&Value::Null);
    if params.get("name").and_then(|n| n.as_str()) != Some("explain_table") {
        return make_error(id, -32602, "Unknown prompt");
    }
    let table = params
        .get("arguments")
        .and_then(|a| a.get("table"))
        .and_then(|t| t.as_str())
        .unwrap_or("unknown");
    ok(
        id,
        json!({
            "description": "Explain what a table holds",
            "messages": [{
                "role": "user",
                "content": {"type": "text", "text": format!("Explain the {} table", table)}
            }]
        }),
    )
}

/// Build a JSON-RPC error response.
fn make_error(id: &Value, code: i32, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {"code": code, "message": message}
    })
}
