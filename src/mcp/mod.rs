//! MCP (Model Context Protocol) client support for mcpilot
//!
//! This module provides the client side of MCP: the wire types, the two
//! transports, and the typed [`client::McpClient`] facade the agent uses to
//! discover and invoke server tools.
//!
//! The implementation targets protocol revision **2024-11-05**.
//!
//! # Module Layout
//!
//! - `types`     -- MCP protocol types and JSON-RPC primitives
//! - `transport` -- `Transport` trait with stdio and HTTP implementations
//! - `client`    -- Typed facade over `Arc<dyn Transport>`

pub mod client;
pub mod transport;
pub mod types;

pub use client::McpClient;
pub use transport::{Transport, TransportKind};
