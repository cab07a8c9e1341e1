//! Command-line interface definition for mcpilot
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands to inspect and exercise an MCP server.

use crate::mcp::transport::TransportKind;
use clap::{Parser, Subcommand};

/// mcpilot - MCP client and server inspector
///
/// Connects to an MCP server over stdio or HTTP and lists or invokes
/// its tools, resources, prompts, and database connections.
#[derive(Parser, Debug, Clone)]
#[command(name = "mcpilot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Transport mode (stdio, http)
    #[arg(short, long, global = true)]
    pub mode: Option<TransportKind>,

    /// MCP server URL for http mode
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Bearer token for http mode
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// MCP server executable for stdio mode
    #[arg(long, global = true)]
    pub server_path: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for mcpilot
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// List the server's tools
    Tools,

    /// List the server's resources
    Resources,

    /// List the server's prompts
    Prompts,

    /// List configured database connections
    Databases,

    /// Switch the session's active database connection
    Use {
        /// Connection name
        name: String,
    },

    /// Invoke a tool
    Call {
        /// Tool name
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },

    /// Read a resource
    Read {
        /// Resource URI
        uri: String,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
