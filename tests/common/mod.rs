//! Shared helpers for mcpilot integration tests

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mcpilot::mcp::transport::stdio::StdioTransport;
use mcpilot::mcp::types::McpTool;
use mcpilot::mcp::McpClient;
use mcpilot::providers::{LlmClient, LlmResponse, Message, ModelInfo};

/// Returns the path to the `mcp_test_server` binary.
///
/// Cargo sets `CARGO_BIN_EXE_mcp_test_server` when building integration
/// tests of this package.
#[allow(dead_code)]
pub fn test_server_exe() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mcp_test_server"))
}

/// Spawns the test server and returns an initialized client.
#[allow(dead_code)]
pub async fn spawn_client() -> McpClient {
    let transport = StdioTransport::spawn(test_server_exe(), vec![], HashMap::new(), None)
        .expect("failed to spawn mcp_test_server");
    let client = McpClient::new(Arc::new(transport));
    client.initialize().await.expect("initialize failed");
    client
}

/// A language model stub that replays canned responses in order.
///
/// Every request is recorded so tests can assert on what the model saw.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<LlmResponse>>,
    seen: Mutex<Vec<Vec<Message>>>,
}

#[allow(dead_code)]
impl ScriptedLlm {
    pub fn new(responses: Vec<LlmResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Message lists passed to each `chat` call.
    pub fn seen(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat(&self, messages: &[Message], _tools: &[McpTool]) -> anyhow::Result<LlmResponse> {
        self.seen.lock().unwrap().push(messages.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("scripted responses exhausted"))
    }

    async fn list_models(&self) -> anyhow::Result<Vec<ModelInfo>> {
        Ok(vec![ModelInfo::new("scripted")])
    }
}
