//! Command handlers for the mcpilot CLI
//!
//! Each subcommand opens the configured transport, performs the MCP
//! handshake, runs one operation, prints the outcome, and closes the
//! connection again.

use crate::cli::Commands;
use crate::config::Config;
use crate::error::{McpilotError, Result};
use crate::mcp::client::McpClient;
use crate::mcp::types::{ListDatabasesResult, McpTool, Prompt, ReadResourceResult, Resource};
use colored::Colorize;
use prettytable::{format, row, Table};

/// Connects according to `config` and runs `command`
///
/// The connection is closed whether or not the command succeeds.
///
/// # Errors
///
/// Returns transport, protocol, or tool errors raised by the command
pub async fn run(config: &Config, command: Commands) -> Result<()> {
    let client = McpClient::new(config.mcp.connect()?);

    let outcome = async {
        let init = client.initialize().await?;
        tracing::debug!(
            "Connected to {} {} over {}",
            init.server_info.name,
            init.server_info.version,
            client.kind()
        );
        execute(&client, command).await
    }
    .await;

    if let Err(e) = client.close().await {
        tracing::warn!("Failed to close MCP connection: {}", e);
    }
    outcome
}

/// Runs `command` against an initialized client and prints the result
pub async fn execute(client: &McpClient, command: Commands) -> Result<()> {
    match command {
        Commands::Tools => {
            let tools = client.list_tools().await?;
            print_listing("Tools", tools.len(), tools_table(&tools));
        }
        Commands::Resources => {
            let resources = client.list_resources().await?;
            print_listing("Resources", resources.len(), resources_table(&resources));
        }
        Commands::Prompts => {
            let prompts = client.list_prompts().await?;
            print_listing("Prompts", prompts.len(), prompts_table(&prompts));
        }
        Commands::Databases => {
            let databases = client.list_databases().await?;
            print_listing(
                "Database connections",
                databases.databases.len(),
                databases_table(&databases),
            );
        }
        Commands::Use { name } => {
            let selected = client.select_database(&name).await?;
            let current = selected.current.unwrap_or(name);
            println!("{} {}", "Now using".green(), current.cyan());
            if let Some(message) = selected.message {
                println!("{}", message.dimmed());
            }
        }
        Commands::Call { tool, args } => {
            let arguments = parse_tool_args(&args)?;
            let result = client.call_tool(&tool, arguments).await?;
            let text = result.text();
            if result.is_error {
                return Err(McpilotError::Tool(text).into());
            }
            println!("{}", text);
        }
        Commands::Read { uri } => {
            let contents = client.read_resource(&uri).await?;
            println!("{}", render_resource(&contents));
        }
    }
    Ok(())
}

/// Parses `--args` into a JSON object
pub fn parse_tool_args(raw: &str) -> Result<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| McpilotError::Config(format!("Invalid tool arguments: {}", e)))?;
    if !value.is_object() {
        return Err(McpilotError::Config(
            "Tool arguments must be a JSON object".to_string(),
        )
        .into());
    }
    Ok(value)
}

fn print_listing(title: &str, count: usize, table: Table) {
    if count == 0 {
        println!("{}", format!("No {} found.", title.to_lowercase()).yellow());
        return;
    }
    println!("\n{} ({}):", title.bold(), count);
    table.printstd();
    println!();
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table
}

fn tools_table(tools: &[McpTool]) -> Table {
    let mut table = new_table();
    table.set_titles(row!["Name".bold(), "Description".bold()]);
    for tool in tools {
        table.add_row(row![tool.name.cyan(), first_line(&tool.description)]);
    }
    table
}

fn resources_table(resources: &[Resource]) -> Table {
    let mut table = new_table();
    table.set_titles(row!["URI".bold(), "Name".bold(), "Description".bold()]);
    for resource in resources {
        table.add_row(row![
            resource.uri.cyan(),
            resource.name,
            first_line(resource.description.as_deref().unwrap_or("-"))
        ]);
    }
    table
}

fn prompts_table(prompts: &[Prompt]) -> Table {
    let mut table = new_table();
    table.set_titles(row!["Name".bold(), "Arguments".bold(), "Description".bold()]);
    for prompt in prompts {
        let arguments = prompt
            .arguments
            .iter()
            .map(|a| {
                if a.required {
                    format!("{}*", a.name)
                } else {
                    a.name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(row![
            prompt.name.cyan(),
            arguments,
            first_line(prompt.description.as_deref().unwrap_or("-"))
        ]);
    }
    table
}

fn databases_table(databases: &ListDatabasesResult) -> Table {
    let mut table = new_table();
    table.set_titles(row![
        "".bold(),
        "Name".bold(),
        "Host".bold(),
        "Database".bold(),
        "User".bold(),
        "SSL".bold()
    ]);
    for db in &databases.databases {
        let marker = if db.name == databases.current { "*" } else { "" };
        table.add_row(row![
            marker.green(),
            db.name.cyan(),
            format!("{}:{}", db.host, db.port),
            db.database,
            db.user,
            db.sslmode
        ]);
    }
    table
}

fn render_resource(result: &ReadResourceResult) -> String {
    result
        .contents
        .iter()
        .map(|c| match (&c.text, &c.blob) {
            (Some(text), _) => text.clone(),
            (None, Some(blob)) => format!(
                "<{} bytes of {}>",
                blob.len(),
                c.mime_type.as_deref().unwrap_or("binary data")
            ),
            (None, None) => String::new(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}
