//! Canonical conversation transcript
//!
//! The [`Conversation`] is the single source of truth for a session's
//! messages. It is append-only while a query runs: the agent commits each
//! iteration's messages in one step, and compaction only ever reads it to
//! build a shorter copy for the outgoing model call.

use crate::providers::{Message, MessageContent};

/// Estimated token count of a single message.
///
/// Uses a cheap heuristic: `(chars + 2) / 3` over the flattened text.
pub fn estimate_message_tokens(message: &Message) -> usize {
    (message.flatten().chars().count() + 2) / 3
}

/// Estimated token count of a slice of messages.
///
/// # Examples
///
/// ```
/// use mcpilot::agent::conversation::estimate_tokens;
/// use mcpilot::providers::Message;
///
/// let messages = vec![Message::user("abcdef"), Message::assistant("abc")];
/// assert_eq!(estimate_tokens(&messages), 2 + 1);
/// ```
pub fn estimate_tokens(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}

/// Append-only transcript owned by an agent.
///
/// # Examples
///
/// ```
/// use mcpilot::agent::Conversation;
///
/// let mut conversation = Conversation::new();
/// conversation.add_user_message("list databases");
/// assert_eq!(conversation.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Creates an empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a user text message
    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Appends an assistant text message
    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Appends one message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Appends a batch of messages produced by one loop iteration.
    ///
    /// The batch lands in full or, if never committed, not at all.
    pub fn commit(&mut self, batch: Vec<Message>) {
        self.messages.extend(batch);
    }

    /// All messages in order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Text of the most recent assistant text message
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == crate::mcp::types::Role::Assistant)
            .and_then(Message::text)
    }

    /// Heuristic token estimate of the whole transcript
    pub fn token_estimate(&self) -> usize {
        estimate_tokens(&self.messages)
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Resets the transcript between sessions
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Returns true when every assistant tool-use message is followed by a
    /// user message carrying exactly one result per tool-use id.
    pub fn tool_pairs_are_complete(&self) -> bool {
        let messages = &self.messages;
        for (i, message) in messages.iter().enumerate() {
            let MessageContent::ToolUses(uses) = &message.content else {
                continue;
            };
            let Some(MessageContent::ToolResults(results)) =
                messages.get(i + 1).map(|m| &m.content)
            else {
                return false;
            };
            if uses.len() != results.len() {
                return false;
            }
            let all_answered = uses.iter().all(|u| {
                results
                    .iter()
                    .filter(|r| r.tool_use_id == u.id)
                    .count()
                    == 1
            });
            if !all_answered {
                return false;
            }
        }
        true
    }
}
