//! Base LLM client trait and common message types for mcpilot
//!
//! This module defines the [`LlmClient`] trait every language model backend
//! implements, along with the transcript message types shared by the agent,
//! the compaction engine and provider implementations.
//!
//! # Wire form
//!
//! Messages serialize to `{role, content}`. `content` is a string for text
//! messages and an array of typed blocks otherwise:
//!
//! - `{"type": "text", "text": ...}`
//! - `{"type": "tool_use", "id": ..., "name": ..., "input": {...}}`
//! - `{"type": "tool_result", "tool_use_id": ..., "content": [...], "is_error": bool}`
//!
//! Decoding is lenient: an array containing `tool_use` blocks becomes
//! [`MessageContent::ToolUses`] (interleaved text is dropped), an array of
//! `tool_result` blocks becomes [`MessageContent::ToolResults`], and an array
//! of text blocks becomes newline-joined [`MessageContent::Text`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::mcp::types::{join_text, ContentItem, McpTool, Role};

/// Stop reason signalling that the model wants tools executed.
pub const STOP_REASON_TOOL_USE: &str = "tool_use";

/// An assistant's request to invoke one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUse {
    /// Identifier correlating this request with its [`ToolResult`]
    pub id: String,
    /// Tool name as advertised by the MCP server
    pub name: String,
    /// Arguments object
    pub input: serde_json::Value,
}

/// The outcome of one [`ToolUse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Id of the [`ToolUse`] this answers
    pub tool_use_id: String,
    /// Content items returned by the tool
    pub content: Vec<ContentItem>,
    /// Whether the tool (or the call) failed
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    /// Builds a failed result carrying `Error: <message>`.
    pub fn error(tool_use_id: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            content: vec![ContentItem::text(format!("Error: {}", message))],
            is_error: true,
        }
    }

    /// Newline-joined text of the result's text items.
    pub fn text(&self) -> String {
        join_text(&self.content)
    }
}

/// Body of a transcript message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    /// Plain text
    Text(String),
    /// Tool invocations requested by the assistant, in emitted order
    ToolUses(Vec<ToolUse>),
    /// Tool outcomes, in the same order as the requesting uses
    ToolResults(Vec<ToolResult>),
}

/// One transcript entry.
///
/// # Examples
///
/// ```
/// use mcpilot::providers::{Message, MessageContent};
/// use mcpilot::mcp::types::Role;
///
/// let msg = Message::user("Hello, assistant!");
/// assert_eq!(msg.role, Role::User);
/// assert_eq!(msg.content, MessageContent::Text("Hello, assistant!".into()));
///
/// let json = serde_json::to_value(&msg).unwrap();
/// assert_eq!(json["content"], "Hello, assistant!");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireMessage", from = "WireMessage")]
pub struct Message {
    /// Author of the message
    pub role: Role,
    /// Body of the message
    pub content: MessageContent,
}

impl Message {
    /// Creates a user text message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Creates an assistant text message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Creates an assistant message requesting tool executions
    pub fn tool_uses(uses: Vec<ToolUse>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::ToolUses(uses),
        }
    }

    /// Creates the user message carrying tool results
    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::ToolResults(results),
        }
    }

    /// Returns the text body of a text message
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns true for messages carrying tool uses
    pub fn is_tool_uses(&self) -> bool {
        matches!(self.content, MessageContent::ToolUses(_))
    }

    /// Returns true for messages carrying tool results
    pub fn is_tool_results(&self) -> bool {
        matches!(self.content, MessageContent::ToolResults(_))
    }

    /// Flat text rendering used for token estimation and display.
    ///
    /// Tool uses render as `name input-json`; tool results render their
    /// text items.
    pub fn flatten(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::ToolUses(uses) => uses
                .iter()
                .map(|u| format!("{} {}", u.name, u.input))
                .collect::<Vec<_>>()
                .join("\n"),
            MessageContent::ToolResults(results) => results
                .iter()
                .map(ToolResult::text)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    role: Role,
    content: WireContent,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Blocks(Vec<WireBlock>),
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: Vec<ContentItem>,
        #[serde(default)]
        is_error: bool,
    },
}

impl From<Message> for WireMessage {
    fn from(message: Message) -> Self {
        let content = match message.content {
            MessageContent::Text(text) => WireContent::Text(text),
            MessageContent::ToolUses(uses) => WireContent::Blocks(
                uses.into_iter()
                    .map(|u| WireBlock::ToolUse {
                        id: u.id,
                        name: u.name,
                        input: u.input,
                    })
                    .collect(),
            ),
            MessageContent::ToolResults(results) => WireContent::Blocks(
                results
                    .into_iter()
                    .map(|r| WireBlock::ToolResult {
                        tool_use_id: r.tool_use_id,
                        content: r.content,
                        is_error: r.is_error,
                    })
                    .collect(),
            ),
        };
        WireMessage {
            role: message.role,
            content,
        }
    }
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        let blocks = match wire.content {
            WireContent::Text(text) => {
                return Message {
                    role: wire.role,
                    content: MessageContent::Text(text),
                }
            }
            WireContent::Blocks(blocks) => blocks,
        };

        let mut texts = Vec::new();
        let mut uses = Vec::new();
        let mut results = Vec::new();
        for block in blocks {
            match block {
                WireBlock::Text { text } => texts.push(text),
                WireBlock::ToolUse { id, name, input } => uses.push(ToolUse { id, name, input }),
                WireBlock::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                } => results.push(ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                }),
            }
        }

        let content = if !uses.is_empty() {
            MessageContent::ToolUses(uses)
        } else if !results.is_empty() {
            MessageContent::ToolResults(results)
        } else {
            MessageContent::Text(texts.join("\n"))
        };
        Message {
            role: wire.role,
            content,
        }
    }
}

/// One block of a model response.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    /// Text emitted by the model
    Text(String),
    /// A tool invocation request
    ToolUse(ToolUse),
}

/// A model response: content blocks plus the reason generation stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    /// Blocks in emitted order
    pub content: Vec<ContentBlock>,
    /// Provider stop reason (`"tool_use"`, `"end_turn"`, ...)
    pub stop_reason: String,
}

impl LlmResponse {
    /// A final text answer.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text(text.into())],
            stop_reason: "end_turn".to_string(),
        }
    }

    /// A response requesting the given tool uses.
    pub fn tool_uses(uses: Vec<ToolUse>) -> Self {
        Self {
            content: uses.into_iter().map(ContentBlock::ToolUse).collect(),
            stop_reason: STOP_REASON_TOOL_USE.to_string(),
        }
    }

    /// Whether the model asked for tools to be executed.
    pub fn wants_tools(&self) -> bool {
        self.stop_reason == STOP_REASON_TOOL_USE
    }

    /// The tool uses in emitted order.
    pub fn tool_uses_in_order(&self) -> Vec<ToolUse> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse(u) => Some(u.clone()),
                ContentBlock::Text(_) => None,
            })
            .collect()
    }

    /// All text blocks joined with newlines.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text(t) => Some(t.as_str()),
                ContentBlock::ToolUse(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Model metadata reported by [`LlmClient::list_models`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier
    pub name: String,
    /// Optional display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ModelInfo {
    /// Creates a model entry with no display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
        }
    }
}

/// Uniform capability every language model backend provides.
///
/// Provider wire formats are translated behind this trait.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use mcpilot::providers::{LlmClient, LlmResponse, Message, ModelInfo};
/// use mcpilot::mcp::types::McpTool;
///
/// struct Canned;
///
/// #[async_trait]
/// impl LlmClient for Canned {
///     async fn chat(&self, _m: &[Message], _t: &[McpTool]) -> mcpilot::Result<LlmResponse> {
///         Ok(LlmResponse::text("done"))
///     }
///
///     async fn list_models(&self) -> mcpilot::Result<Vec<ModelInfo>> {
///         Ok(vec![ModelInfo::new("canned")])
///     }
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Ask the model for the next step given the conversation and tools.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails.
    async fn chat(&self, messages: &[Message], tools: &[McpTool]) -> Result<LlmResponse>;

    /// List the models this backend can serve.
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_message_serializes_as_string() {
        let value = serde_json::to_value(Message::assistant("hi")).unwrap();
        assert_eq!(value, json!({"role": "assistant", "content": "hi"}));
    }

    #[test]
    fn test_tool_uses_serialize_as_blocks() {
        let msg = Message::tool_uses(vec![ToolUse {
            id: "t1".into(),
            name: "echo".into(),
            input: json!({"text": "hi"}),
        }]);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["content"][0]["type"], "tool_use");
        assert_eq!(value["content"][0]["input"]["text"], "hi");
    }

    #[test]
    fn test_tool_results_serialize_with_error_flag() {
        let msg = Message::tool_results(vec![ToolResult::error("t1", "boom")]);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["content"][0]["type"], "tool_result");
        assert_eq!(value["content"][0]["tool_use_id"], "t1");
        assert_eq!(value["content"][0]["is_error"], true);
        assert_eq!(value["content"][0]["content"][0]["text"], "Error: boom");
    }

    #[test]
    fn test_mixed_text_and_tool_use_decodes_as_tool_uses() {
        let msg: Message = serde_json::from_value(json!({
            "role": "assistant",
            "content": [
                {"type": "text", "text": "let me check"},
                {"type": "tool_use", "id": "a", "name": "query", "input": {}}
            ]
        }))
        .unwrap();
        match msg.content {
            MessageContent::ToolUses(uses) => {
                assert_eq!(uses.len(), 1);
                assert_eq!(uses[0].name, "query");
            }
            other => panic!("unexpected content: {:?}", other),
        }
    }

    #[test]
    fn test_text_blocks_decode_as_joined_text() {
        let msg: Message = serde_json::from_value(json!({
            "role": "assistant",
            "content": [{"type": "text", "text": "a"}, {"type": "text", "text": "b"}]
        }))
        .unwrap();
        assert_eq!(msg.text(), Some("a\nb"));
    }

    #[test]
    fn test_flatten_renders_tool_uses_and_results() {
        let uses = Message::tool_uses(vec![ToolUse {
            id: "1".into(),
            name: "echo".into(),
            input: json!({"text": "x"}),
        }]);
        assert_eq!(uses.flatten(), r#"echo {"text":"x"}"#);

        let results = Message::tool_results(vec![ToolResult {
            tool_use_id: "1".into(),
            content: vec![ContentItem::text("one"), ContentItem::text("two")],
            is_error: false,
        }]);
        assert_eq!(results.flatten(), "one\ntwo");
    }

    #[test]
    fn test_llm_response_helpers() {
        let response = LlmResponse {
            content: vec![
                ContentBlock::Text("thinking".into()),
                ContentBlock::ToolUse(ToolUse {
                    id: "1".into(),
                    name: "echo".into(),
                    input: json!({}),
                }),
            ],
            stop_reason: STOP_REASON_TOOL_USE.into(),
        };
        assert!(response.wants_tools());
        assert_eq!(response.tool_uses_in_order().len(), 1);
        assert_eq!(response.joined_text(), "thinking");
        assert!(!LlmResponse::text("done").wants_tools());
    }
}
