//! mcpilot - MCP client library
//!
//! This library provides a client for the Model Context Protocol (MCP) that
//! lets a language model drive multi-step tasks through server-exposed tools.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `mcp`: JSON-RPC types, the stdio and HTTP transports, and the typed client
//! - `agent`: Conversation, compaction engine, and the tool-calling loop
//! - `providers`: The language model abstraction the agent drives
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line interface and its handlers
//!
//! # Example
//!
//! ```no_run
//! use mcpilot::mcp::McpClient;
//! use mcpilot::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let client = McpClient::new(config.mcp.connect()?);
//!     client.initialize().await?;
//!     println!("{} tools", client.list_tools().await?.len());
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod mcp;
pub mod providers;

// Re-export commonly used types
pub use agent::Agent;
pub use config::Config;
pub use error::{McpilotError, Result};
