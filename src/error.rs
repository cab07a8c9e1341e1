//! Error types for mcpilot
//!
//! This module defines all error types used throughout the crate, using
//! `thiserror` for ergonomic error handling.
//!
//! Three error classes matter above the transport layer:
//!
//! - [`McpilotError::McpTransport`]: the process or network failed, a frame
//!   was malformed, the peer hung up, or an HTTP status was not 200.
//! - [`McpilotError::McpProtocol`]: the peer answered with a well-formed
//!   JSON-RPC `error` object.
//! - Application errors: a tool reporting `is_error: true`. This is not an
//!   error at this layer at all; it is carried inside
//!   [`crate::mcp::types::CallToolResult`].

use thiserror::Error;

/// Main error type for mcpilot operations
///
/// This enum encompasses all possible errors that can occur during
/// configuration loading, MCP transport exchanges, agent execution and
/// LLM provider interactions.
#[derive(Error, Debug)]
pub enum McpilotError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-related errors (LLM calls, model listing)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Tool execution errors raised locally (bad arguments, undecodable
    /// tool output, tool-level failures surfaced to a caller)
    #[error("Tool execution error: {0}")]
    Tool(String),

    /// Process, pipe, or network failure in an MCP transport
    #[error("MCP transport error: {0}")]
    McpTransport(String),

    /// Well-formed JSON-RPC error returned by the MCP peer
    #[error("RPC error {code}: {message}")]
    McpProtocol {
        /// JSON-RPC error code
        code: i64,
        /// Human readable error message from the peer
        message: String,
    },

    /// Agent exceeded maximum iteration limit
    #[error("Agent exceeded maximum iterations: limit={limit}, {message}")]
    MaxIterationsExceeded {
        /// The configured iteration limit
        limit: usize,
        /// Additional context about the failure
        message: String,
    },

    /// The query was cancelled before it completed
    #[error("Operation cancelled")]
    Cancelled,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl McpilotError {
    /// Returns true when the error is a transport-level failure
    pub fn is_transport(&self) -> bool {
        matches!(self, McpilotError::McpTransport(_) | McpilotError::Http(_))
    }

    /// Returns the JSON-RPC error code when this is a protocol error
    pub fn protocol_code(&self) -> Option<i64> {
        match self {
            McpilotError::McpProtocol { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result type alias for mcpilot operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation. Typed
/// variants are recovered with `downcast_ref::<McpilotError>()`.
pub type Result<T> = anyhow::Result<T>;

/// Returns true when `err` is (or wraps) [`McpilotError::Cancelled`]
pub fn is_cancelled(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<McpilotError>(),
        Some(McpilotError::Cancelled)
    )
}
