//! CLI integration tests
//!
//! Runs the `mcpilot` binary against the `mcp_test_server` subprocess.

use assert_cmd::Command;
use predicates::prelude::*;

fn mcpilot() -> Command {
    let mut cmd = Command::cargo_bin("mcpilot").unwrap();
    cmd.env_remove("MCPILOT_MCP_MODE")
        .env_remove("MCPILOT_MCP_URL")
        .env_remove("MCPILOT_SERVER_PATH")
        .arg("--config")
        .arg("does-not-exist.yaml")
        .arg("--server-path")
        .arg(env!("CARGO_BIN_EXE_mcp_test_server"));
    cmd
}

#[test]
fn test_cli_help() {
    Command::cargo_bin("mcpilot")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("tools"))
        .stdout(predicate::str::contains("databases"));
}

#[test]
fn test_cli_lists_tools() {
    mcpilot()
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("echo"))
        .stdout(predicate::str::contains("select_database_connection"));
}

#[test]
fn test_cli_lists_databases() {
    mcpilot()
        .arg("databases")
        .assert()
        .success()
        .stdout(predicate::str::contains("analytics"))
        .stdout(predicate::str::contains("warehouse"));
}

#[test]
fn test_cli_calls_tool() {
    mcpilot()
        .args(["call", "echo", "--args", r#"{"text":"hi"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("echo executed"));
}

#[test]
fn test_cli_tool_failure_exits_non_zero() {
    mcpilot()
        .args(["call", "fail"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("tool failed on purpose"));
}

#[test]
fn test_cli_reads_resource() {
    mcpilot()
        .args(["read", "pg://system_info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PostgreSQL 16.2"));
}

#[test]
fn test_cli_http_mode_requires_url() {
    Command::cargo_bin("mcpilot")
        .unwrap()
        .env_remove("MCPILOT_MCP_URL")
        .args(["--config", "does-not-exist.yaml", "--mode", "http", "tools"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("mcp.url is required"));
}
