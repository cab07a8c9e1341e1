//! In-process fake transport for MCP unit tests
//!
//! [`FakeTransport`] replaces real process or network I/O. Tests script
//! results per method (or per tool for `tools/call`, keyed as
//! `tools/call:<name>`), optionally delay specific methods, and inspect
//! every call afterwards through [`FakeTransport::calls`].
//!
//! Scripted results are consumed in order; the last one for a key is
//! repeated once the rest are used up. Unscripted methods get a default:
//! a canned `initialize` result, the configured tool list for
//! `tools/list`, and `-32601 Method not found` for anything else.
//!
//! # Example
//!
//! ```ignore
//! let fake = Arc::new(
//!     FakeTransport::new(TransportKind::Stdio)
//!         .respond("tools/call:echo", Ok(json!({"content": [{"type": "text", "text": "hi"}]}))),
//! );
//! let client = McpClient::new(fake.clone());
//! client.call_tool("echo", json!({})).await?;
//! assert_eq!(fake.calls()[0].method, "tools/call");
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};

use crate::agent::compaction::RemoteCompactor;
use crate::error::{McpilotError, Result};
use crate::mcp::transport::{Transport, TransportKind};
use crate::mcp::types::{McpTool, METHOD_TOOLS_CALL};

/// One call observed by the fake.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Method name
    pub method: String,
    /// Parameters as sent
    pub params: Option<Value>,
    /// True for notifications
    pub notification: bool,
}

#[derive(Debug, Clone)]
enum Scripted {
    Ok(Value),
    Protocol(i64, String),
    Transport(String),
}

impl Scripted {
    fn into_result(self) -> Result<Value> {
        match self {
            Scripted::Ok(v) => Ok(v),
            Scripted::Protocol(code, message) => {
                Err(McpilotError::McpProtocol { code, message }.into())
            }
            Scripted::Transport(reason) => Err(McpilotError::McpTransport(reason).into()),
        }
    }
}

/// Scripted transport for tests.
#[derive(Debug)]
pub struct FakeTransport {
    kind: TransportKind,
    tools: Mutex<Vec<McpTool>>,
    scripted: Mutex<HashMap<String, VecDeque<Scripted>>>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<RecordedCall>>,
    remote: Option<Arc<dyn RemoteCompactor>>,
    closed: AtomicBool,
}

impl FakeTransport {
    /// Creates a fake reporting `kind`.
    pub fn new(kind: TransportKind) -> Self {
        Self {
            kind,
            tools: Mutex::new(Vec::new()),
            scripted: Mutex::new(HashMap::new()),
            delays: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            remote: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Sets the tool list returned by an unscripted `tools/list`.
    pub fn with_tools(self, tools: Vec<McpTool>) -> Self {
        self.set_tools(tools);
        self
    }

    /// Replaces the tool list mid-test.
    pub fn set_tools(&self, tools: Vec<McpTool>) {
        *self.tools.lock().unwrap() = tools;
    }

    /// Queues a result for `key` (a method, or `tools/call:<name>`).
    pub fn respond(self, key: &str, result: std::result::Result<Value, McpilotError>) -> Self {
        let scripted = match result {
            Ok(v) => Scripted::Ok(v),
            Err(McpilotError::McpProtocol { code, message }) => Scripted::Protocol(code, message),
            Err(McpilotError::McpTransport(reason)) => Scripted::Transport(reason),
            Err(other) => Scripted::Transport(other.to_string()),
        };
        self.scripted
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push_back(scripted);
        self
    }

    /// Delays every call to `key` by `delay`.
    pub fn delay(mut self, key: &str, delay: Duration) -> Self {
        self.delays.insert(key.to_string(), delay);
        self
    }

    /// Offers `remote` as this transport's remote compactor.
    pub fn with_remote_compactor(mut self, remote: Arc<dyn RemoteCompactor>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Every call observed so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls made to `method`.
    pub fn count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Whether `close` was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn next_scripted(&self, key: &str) -> Option<Scripted> {
        let mut scripted = self.scripted.lock().unwrap();
        let queue = scripted.get_mut(key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    fn default_result(&self, method: &str) -> Result<Value> {
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "serverInfo": {"name": "fake-server", "version": "0.0.0"}
            })),
            "tools/list" => {
                let tools = self.tools.lock().unwrap().clone();
                Ok(json!({ "tools": tools }))
            }
            _ => Err(McpilotError::McpProtocol {
                code: -32601,
                message: "Method not found".to_string(),
            }
            .into()),
        }
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: method.to_string(),
            params: params.clone(),
            notification: false,
        });

        let tool_key = (method == METHOD_TOOLS_CALL)
            .then(|| {
                params
                    .as_ref()
                    .and_then(|p| p["name"].as_str())
                    .map(|name| format!("{}:{}", METHOD_TOOLS_CALL, name))
            })
            .flatten();

        let delay = tool_key
            .as_ref()
            .and_then(|k| self.delays.get(k))
            .or_else(|| self.delays.get(method))
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = tool_key
            .as_deref()
            .and_then(|k| self.next_scripted(k))
            .or_else(|| self.next_scripted(method));
        match scripted {
            Some(s) => s.into_result(),
            None => self.default_result(method),
        }
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: method.to_string(),
            params,
            notification: true,
        });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn remote_compactor(&self) -> Option<Arc<dyn RemoteCompactor>> {
        self.remote.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_last_scripted_result_repeats() {
        let fake = FakeTransport::new(TransportKind::Stdio)
            .respond("ping", Ok(json!(1)))
            .respond("ping", Ok(json!(2)));
        assert_eq!(fake.request("ping", None).await.unwrap(), json!(1));
        assert_eq!(fake.request("ping", None).await.unwrap(), json!(2));
        assert_eq!(fake.request("ping", None).await.unwrap(), json!(2));
        assert_eq!(fake.count("ping"), 3);
    }

    #[tokio::test]
    async fn test_tool_specific_script_wins() {
        let fake = FakeTransport::new(TransportKind::Stdio)
            .respond("tools/call", Ok(json!("generic")))
            .respond("tools/call:echo", Ok(json!("echo")));
        let echo = fake
            .request("tools/call", Some(json!({"name": "echo"})))
            .await
            .unwrap();
        let other = fake
            .request("tools/call", Some(json!({"name": "other"})))
            .await
            .unwrap();
        assert_eq!(echo, json!("echo"));
        assert_eq!(other, json!("generic"));
    }

    #[tokio::test]
    async fn test_unscripted_method_is_method_not_found() {
        let fake = FakeTransport::new(TransportKind::Http);
        let err = fake.request("resources/list", None).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<McpilotError>().unwrap().protocol_code(),
            Some(-32601)
        );
    }
}
