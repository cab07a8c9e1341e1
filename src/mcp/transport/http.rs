//! HTTP transport for MCP
//!
//! This module implements [`HttpTransport`]: every JSON-RPC request is an
//! independent `POST` of the same envelope the stdio transport writes, to a
//! single endpoint (conventionally `<base>/mcp/v1`). The response body is one
//! JSON-RPC response object.
//!
//! # Authentication
//!
//! When a token is configured every POST carries `Authorization: Bearer
//! <token>`. Without a token the header is omitted entirely.
//!
//! # Errors
//!
//! Any status other than `200 OK` is a transport error whose message carries
//! the status code and the response body text. There is no transport-level
//! retry; timeouts come from the underlying `reqwest::Client`.
//!
//! # Remote compaction
//!
//! Servers reached over HTTP may also expose a compaction endpoint
//! (conventionally `<base>/api/chat/compact`). [`HttpTransport::remote_compactor`]
//! hands out an [`HttpCompactor`] sharing this transport's client and token.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use tokio::sync::Mutex;
use tracing::debug;

use crate::agent::compaction::{CompactRequest, CompactResponse, RemoteCompactor};
use crate::error::{McpilotError, Result};
use crate::mcp::transport::{Transport, TransportKind};
use crate::mcp::types::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

const LOG_TARGET: &str = "mcpilot::mcp::transport::http";

/// Path the compaction endpoint lives at, relative to the server origin.
pub const COMPACT_PATH: &str = "/api/chat/compact";

/// HTTP POST transport.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use url::Url;
/// use mcpilot::mcp::transport::http::HttpTransport;
///
/// let transport = HttpTransport::new(
///     Url::parse("https://mcp.example.com/mcp/v1").unwrap(),
///     Some("secret-token".to_string()),
///     Duration::from_secs(30),
/// )
/// .unwrap();
/// ```
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: url::Url,
    token: Option<String>,
    compact_url: Option<url::Url>,
    /// Last id handed out; held for the whole exchange so one request is in
    /// flight at a time.
    last_id: Mutex<u64>,
}

impl HttpTransport {
    /// Construct a new [`HttpTransport`] targeting `endpoint`.
    ///
    /// No network I/O is performed at construction time. An empty token is
    /// treated as no token.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - The MCP endpoint URL (e.g. `https://host/mcp/v1`)
    /// * `token` - Optional bearer token
    /// * `timeout` - Per-request timeout
    ///
    /// # Errors
    ///
    /// Returns [`McpilotError::McpTransport`] if the HTTP client cannot be
    /// built.
    pub fn new(endpoint: url::Url, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                McpilotError::McpTransport(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint,
            token: token.filter(|t| !t.is_empty()),
            compact_url: None,
            last_id: Mutex::new(0),
        })
    }

    /// Enables remote compaction against `url`.
    pub fn with_compact_url(mut self, url: url::Url) -> Self {
        self.compact_url = Some(url);
        self
    }

    /// The MCP endpoint this transport posts to.
    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }

    async fn post(&self, body: String) -> Result<(StatusCode, String)> {
        let mut req = self
            .client
            .post(self.endpoint.clone())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .body(body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await.map_err(|e| {
            McpilotError::McpTransport(format!("HTTP POST to {} failed: {}", self.endpoint, e))
        })?;
        let status = response.status();
        let text = response.text().await.map_err(|e| {
            McpilotError::McpTransport(format!("failed to read response body: {}", e))
        })?;
        Ok((status, text))
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let mut last_id = self.last_id.lock().await;
        *last_id += 1;
        let id = *last_id;

        let body = serde_json::to_string(&JsonRpcRequest::new(id, method, params))?;
        debug!(target: LOG_TARGET, "-> {} (id {})", method, id);

        let (status, text) = self.post(body).await?;
        if status != StatusCode::OK {
            return Err(McpilotError::McpTransport(format!(
                "HTTP error {}: {}",
                status.as_u16(),
                text
            ))
            .into());
        }

        let response: JsonRpcResponse = serde_json::from_str(&text).map_err(|e| {
            McpilotError::McpTransport(format!("malformed response: {}", e))
        })?;

        // A null id is tolerated; a different id is not.
        let echoed_other = response
            .id
            .as_ref()
            .is_some_and(|v| !v.is_null() && !response.answers(id));
        if echoed_other {
            return Err(McpilotError::McpTransport(format!(
                "response id {} does not match request id {}",
                response.id.as_ref().map(|v| v.to_string()).unwrap_or_default(),
                id
            ))
            .into());
        }

        debug!(target: LOG_TARGET, "<- {} (id {})", method, id);
        Ok(response.into_result()?)
    }

    async fn notify(&self, method: &str, params: Option<serde_json::Value>) -> Result<()> {
        let body = serde_json::to_string(&JsonRpcNotification::new(method, params))?;
        let (status, text) = self.post(body).await?;
        if !status.is_success() {
            return Err(McpilotError::McpTransport(format!(
                "HTTP error {}: {}",
                status.as_u16(),
                text
            ))
            .into());
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Http
    }

    fn remote_compactor(&self) -> Option<Arc<dyn RemoteCompactor>> {
        let url = self.compact_url.clone()?;
        Some(Arc::new(HttpCompactor {
            client: self.client.clone(),
            url,
            token: self.token.clone(),
        }))
    }
}

/// Derives the compaction endpoint from an MCP endpoint: same origin,
/// path [`COMPACT_PATH`].
///
/// # Examples
///
/// ```
/// use url::Url;
/// use mcpilot::mcp::transport::http::compact_url_for;
///
/// let endpoint = Url::parse("https://db.example.com:8443/mcp/v1").unwrap();
/// assert_eq!(
///     compact_url_for(&endpoint).as_str(),
///     "https://db.example.com:8443/api/chat/compact"
/// );
/// ```
pub fn compact_url_for(endpoint: &url::Url) -> url::Url {
    let mut url = endpoint.clone();
    url.set_path(COMPACT_PATH);
    url.set_query(None);
    url.set_fragment(None);
    url
}

/// Remote compaction over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCompactor {
    client: reqwest::Client,
    url: url::Url,
    token: Option<String>,
}

#[async_trait::async_trait]
impl RemoteCompactor for HttpCompactor {
    async fn compact(&self, request: &CompactRequest) -> Result<CompactResponse> {
        let mut req = self.client.post(self.url.clone()).json(request);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await.map_err(|e| {
            McpilotError::McpTransport(format!("compaction request failed: {}", e))
        })?;
        let status = response.status();
        let text = response.text().await.map_err(|e| {
            McpilotError::McpTransport(format!("failed to read compaction response: {}", e))
        })?;
        if status != StatusCode::OK {
            return Err(McpilotError::McpTransport(format!(
                "HTTP error {}: {}",
                status.as_u16(),
                text
            ))
            .into());
        }

        let decoded: CompactResponse = serde_json::from_str(&text).map_err(|e| {
            McpilotError::McpTransport(format!("malformed compaction response: {}", e))
        })?;
        Ok(decoded)
    }
}
