//! Agent core implementation with the tool-calling loop
//!
//! This module implements the loop that:
//! - Builds a compacted view of the transcript for every model call
//! - Executes the tool uses the model requests, in order, through MCP
//! - Commits each iteration's messages to the transcript atomically
//! - Enforces the iteration bound and honours cancellation

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agent::compaction::Compactor;
use crate::agent::thinking::ThinkingIndicator;
use crate::agent::Conversation;
use crate::config::AgentConfig;
use crate::error::{McpilotError, Result};
use crate::mcp::client::McpClient;
use crate::mcp::types::McpTool;
use crate::providers::{
    LlmClient, LlmResponse, Message, MessageContent, ModelInfo, ToolResult, ToolUse,
};

/// The agent driving one conversation against one MCP server
///
/// The agent owns the canonical transcript. Each query alternates between
/// asking the model for the next step and executing the tools it requests
/// until the model answers without tool use, the iteration bound is hit,
/// or the query is cancelled.
///
/// # Examples
///
/// ```ignore
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
/// use mcpilot::agent::Agent;
/// use mcpilot::config::AgentConfig;
///
/// # async fn example(mcp: mcpilot::mcp::McpClient, llm: Arc<dyn mcpilot::providers::LlmClient>) -> mcpilot::Result<()> {
/// let mut agent = Agent::connect(mcp, llm, AgentConfig::default()).await?;
/// let answer = agent.process_query("Which tables are largest?", &CancellationToken::new()).await?;
/// println!("{}", answer);
/// # Ok(())
/// # }
/// ```
pub struct Agent {
    mcp: McpClient,
    llm: Arc<dyn LlmClient>,
    conversation: Conversation,
    tools: Vec<McpTool>,
    compactor: Compactor,
    config: AgentConfig,
}

impl Agent {
    /// Creates an agent with an already known tool list
    ///
    /// The compactor uses the transport's remote compaction capability when
    /// it has one.
    ///
    /// # Errors
    ///
    /// Returns `McpilotError::Config` if `max_iterations` or the compaction
    /// `recent_window` is zero
    pub fn new(
        mcp: McpClient,
        llm: Arc<dyn LlmClient>,
        tools: Vec<McpTool>,
        config: AgentConfig,
    ) -> Result<Self> {
        if config.max_iterations == 0 {
            return Err(
                McpilotError::Config("max_iterations must be greater than 0".to_string()).into(),
            );
        }
        if config.compaction.recent_window == 0 {
            return Err(McpilotError::Config(
                "compaction.recent_window must be greater than 0".to_string(),
            )
            .into());
        }

        let compactor = Compactor::new(config.compaction.clone())
            .with_remote(mcp.transport().remote_compactor());

        debug!(
            "Created agent with {} tools over {}",
            tools.len(),
            mcp.kind()
        );

        Ok(Self {
            mcp,
            llm,
            conversation: Conversation::new(),
            tools,
            compactor,
            config,
        })
    }

    /// Creates an agent and fetches the server's tool list
    ///
    /// # Errors
    ///
    /// Returns the `tools/list` failure, or a configuration error
    pub async fn connect(
        mcp: McpClient,
        llm: Arc<dyn LlmClient>,
        config: AgentConfig,
    ) -> Result<Self> {
        let tools = mcp.list_tools().await?;
        info!("Discovered {} MCP tools", tools.len());
        Self::new(mcp, llm, tools, config)
    }

    /// Replaces the transcript, e.g. to resume a session
    pub fn with_conversation(mut self, conversation: Conversation) -> Self {
        self.conversation = conversation;
        self
    }

    /// Runs one user query to completion
    ///
    /// An empty query appends nothing and continues from the current
    /// transcript.
    ///
    /// # Returns
    ///
    /// The final assistant text (all text blocks joined with newlines)
    ///
    /// # Errors
    ///
    /// - `McpilotError::MaxIterationsExceeded` if the bound is reached
    /// - `McpilotError::Cancelled` if `cancel` fires
    /// - Any error raised by the model call
    ///
    /// Tool failures are never returned; they are fed back to the model.
    pub async fn process_query(&mut self, query: &str, cancel: &CancellationToken) -> Result<String> {
        if !query.trim().is_empty() {
            self.conversation.add_user_message(query);
        }
        self.drive(cancel).await
    }

    /// Renders an MCP prompt into the transcript and runs the loop
    ///
    /// Each prompt message carrying text (a text item, or an embedded
    /// resource with a `text` field) is appended with its role; images and
    /// other kinds are skipped.
    pub async fn run_prompt(
        &mut self,
        name: &str,
        arguments: HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let prompt = self.mcp.get_prompt(name, arguments).await?;
        debug!(
            "Prompt {} rendered {} messages",
            name,
            prompt.messages.len()
        );
        let batch = prompt
            .messages
            .into_iter()
            .filter_map(|m| {
                let text = m.content.readable_text()?;
                if text.trim().is_empty() {
                    return None;
                }
                Some(Message {
                    role: m.role,
                    content: MessageContent::Text(text.to_string()),
                })
            })
            .collect();
        self.conversation.commit(batch);
        self.process_query("", cancel).await
    }

    async fn drive(&mut self, cancel: &CancellationToken) -> Result<String> {
        let limit = self.config.max_iterations;

        for iteration in 1..=limit {
            if cancel.is_cancelled() {
                return Err(McpilotError::Cancelled.into());
            }

            let view = self.compactor.compact(self.conversation.messages()).await;
            debug!(
                "Iteration {}/{}: sending {} of {} messages",
                iteration,
                limit,
                view.len(),
                self.conversation.len()
            );

            let response = self.ask_model(&view, cancel).await?;

            let uses = response.tool_uses_in_order();
            if !response.wants_tools() || uses.is_empty() {
                let answer = response.joined_text();
                self.conversation.add_assistant_message(answer.clone());
                info!("Query finished after {} iterations", iteration);
                return Ok(answer);
            }

            let preamble = response.joined_text();
            if !preamble.is_empty() {
                debug!("Model text alongside tool use: {}", preamble);
            }

            let mut results = Vec::with_capacity(uses.len());
            for tool_use in &uses {
                let result = self.run_tool(tool_use, cancel).await?;
                results.push(result);
            }

            self.conversation
                .commit(vec![Message::tool_uses(uses), Message::tool_results(results)]);
        }

        warn!("Maximum iterations ({}) exceeded", limit);
        Err(McpilotError::MaxIterationsExceeded {
            limit,
            message: format!("no final response after {} iterations", limit),
        }
        .into())
    }

    async fn ask_model(&self, view: &[Message], cancel: &CancellationToken) -> Result<LlmResponse> {
        let indicator = ThinkingIndicator::start(self.config.show_thinking, cancel);
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(McpilotError::Cancelled.into()),
            response = self.llm.chat(view, &self.tools) => response,
        };
        indicator.stop().await;
        outcome
    }

    async fn run_tool(
        &mut self,
        tool_use: &ToolUse,
        cancel: &CancellationToken,
    ) -> Result<ToolResult> {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(McpilotError::Cancelled.into()),
            outcome = self.mcp.call_tool(&tool_use.name, tool_use.input.clone()) => outcome,
        };

        match outcome {
            Ok(result) => {
                if result.is_error {
                    debug!("Tool {} reported an error", tool_use.name);
                } else if self.is_state_mutating(&tool_use.name) {
                    if let Err(e) = self.refresh_tools().await {
                        warn!("Failed to refresh tools after {}: {}", tool_use.name, e);
                    }
                }
                Ok(ToolResult {
                    tool_use_id: tool_use.id.clone(),
                    content: result.content,
                    is_error: result.is_error,
                })
            }
            Err(e) => {
                warn!("Tool {} failed: {}", tool_use.name, e);
                Ok(ToolResult::error(&tool_use.id, e))
            }
        }
    }

    fn is_state_mutating(&self, tool: &str) -> bool {
        self.config.state_mutating_tools.iter().any(|t| t == tool)
    }

    /// Re-fetches the server's tool list
    ///
    /// # Errors
    ///
    /// Returns the `tools/list` failure; the previous list is kept
    pub async fn refresh_tools(&mut self) -> Result<()> {
        let tools = self.mcp.list_tools().await?;
        debug!("Tool list refreshed: {} tools", tools.len());
        self.tools = tools;
        Ok(())
    }

    /// Returns the canonical transcript
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns the tools currently offered to the model
    pub fn tools(&self) -> &[McpTool] {
        &self.tools
    }

    /// Returns the MCP client
    pub fn mcp(&self) -> &McpClient {
        &self.mcp
    }

    /// Resets the transcript between sessions
    pub fn clear(&mut self) {
        self.conversation.clear();
    }

    /// Swaps the language model mid-session; the transcript is kept
    pub fn set_llm_client(&mut self, llm: Arc<dyn LlmClient>) {
        self.llm = llm;
    }

    /// Lists the models the current backend serves
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        self.llm.list_models().await
    }
}
