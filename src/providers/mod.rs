//! Language model abstraction for mcpilot
//!
//! Provider-specific wire formats live behind [`LlmClient`]; this crate only
//! ships the trait and the transcript types it exchanges.

pub mod base;

pub use base::{
    ContentBlock, LlmClient, LlmResponse, Message, MessageContent, ModelInfo, ToolResult,
    ToolUse, STOP_REASON_TOOL_USE,
};

#[cfg(test)]
pub use base::MockLlmClient;
