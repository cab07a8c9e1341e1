//! mcpilot - MCP client CLI
//!
#![doc = "mcpilot - MCP client CLI"]
#![doc = "Main entry point for the mcpilot server inspector."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mcpilot::cli::Cli;
use mcpilot::commands;
use mcpilot::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| Config::default_path().to_string_lossy().into_owned());
    let config = Config::load(&config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    tracing::debug!("Running {:?} over {}", cli.command, config.mcp.mode);
    commands::run(&config, cli.command).await
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default = if verbose { "mcpilot=debug" } else { "mcpilot=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
