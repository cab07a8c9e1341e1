//! MCP transport abstraction and implementations
//!
//! This module defines the [`Transport`] trait that both MCP transports
//! satisfy. Concrete implementations live in submodules:
//!
//! - [`stdio::StdioTransport`] spawns a child process and exchanges
//!   newline-delimited JSON over its stdin/stdout pipes, one call at a time.
//! - [`http::HttpTransport`] POSTs each JSON-RPC envelope to a single
//!   endpoint and also hosts the remote compaction capability.
//! - `fake::FakeTransport` is an in-process scripted transport used in
//!   unit tests (cfg(test) only).
//!
//! # Design
//!
//! A transport owns request/response correlation: callers hand it a method
//! and parameters and get back the decoded `result` value. Id allocation,
//! framing and error mapping happen inside the implementation. Errors come
//! back as [`McpilotError::McpTransport`](crate::error::McpilotError) for
//! I/O and framing failures and
//! [`McpilotError::McpProtocol`](crate::error::McpilotError) when the peer
//! answers with a JSON-RPC `error` object.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::agent::compaction::RemoteCompactor;
use crate::error::Result;

/// Which wire the client talks to the server over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Child process speaking newline-delimited JSON on stdin/stdout.
    #[default]
    Stdio,
    /// HTTP POST to a remote endpoint.
    Http,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Stdio => write!(f, "stdio"),
            TransportKind::Http => write!(f, "http"),
        }
    }
}

impl std::str::FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(TransportKind::Stdio),
            "http" => Ok(TransportKind::Http),
            other => Err(format!("unknown transport mode `{}` (expected stdio or http)", other)),
        }
    }
}

/// Abstraction over MCP transport implementations.
///
/// Implementations are used polymorphically through `Arc<dyn Transport>`.
/// A connection has at most one outstanding request at a time; concurrent
/// callers are serialised by the implementation.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Send a request and wait for its correlated result.
    ///
    /// # Arguments
    ///
    /// * `method` - JSON-RPC method name
    /// * `params` - Optional parameters object
    ///
    /// # Returns
    ///
    /// The raw `result` value of the response (`Null` when absent)
    ///
    /// # Errors
    ///
    /// Returns `McpilotError::McpTransport` on I/O, framing or correlation
    /// failure and `McpilotError::McpProtocol` when the peer answers with an
    /// error object.
    async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value>;

    /// Send a fire-and-forget notification. No response is read.
    ///
    /// # Errors
    ///
    /// Returns `McpilotError::McpTransport` if the message cannot be written.
    async fn notify(&self, method: &str, params: Option<serde_json::Value>) -> Result<()>;

    /// Release the transport's resources. Later calls fail with a transport
    /// error.
    async fn close(&self) -> Result<()>;

    /// Which wire this transport uses.
    fn kind(&self) -> TransportKind;

    /// Remote compaction capability hosted next to this transport, if any.
    fn remote_compactor(&self) -> Option<Arc<dyn RemoteCompactor>> {
        None
    }
}

pub mod http;
pub mod stdio;

#[cfg(test)]
pub mod fake;
