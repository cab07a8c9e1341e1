//! Conversation compaction
//!
//! Before every model call the agent asks the [`Compactor`] for a view of
//! the transcript that fits the token budget. The canonical transcript is
//! never touched; the compactor returns an independent, possibly shorter
//! copy.
//!
//! Policy:
//!
//! 1. Transcripts shorter than `min_messages` are sent as-is.
//! 2. If even the smallest view (`1 + recent_window` messages) would save
//!    fewer than `min_savings` messages, the transcript is sent as-is.
//! 3. When the transport offers a [`RemoteCompactor`], it is tried first.
//!    Any failure, or a result saving fewer than `min_savings` messages,
//!    falls back to the local path. Failures are logged, never surfaced.
//! 4. The local path keeps the first message when it is a user message
//!    (the anchor) plus the last `recent_window` messages, widening the
//!    window by one when it would otherwise start on tool results whose
//!    tool uses fall outside it. A result that still saves fewer than
//!    `min_savings` messages is discarded.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::conversation::estimate_tokens;
use crate::error::Result;
use crate::mcp::types::Role;
use crate::providers::Message;

fn default_max_tokens() -> usize {
    100_000
}

fn default_recent_window() -> usize {
    10
}

fn default_keep_anchors() -> bool {
    true
}

fn default_min_messages() -> usize {
    30
}

fn default_min_savings() -> usize {
    5
}

/// Compaction tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionSettings {
    /// Token budget handed to the remote compactor
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Number of most recent messages always kept verbatim
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,

    /// Keep the first user message (the anchor) in the local path
    #[serde(default = "default_keep_anchors")]
    pub keep_anchors: bool,

    /// Transcripts shorter than this are never compacted
    #[serde(default = "default_min_messages")]
    pub min_messages: usize,

    /// Minimum number of dropped messages that makes compaction worthwhile
    #[serde(default = "default_min_savings")]
    pub min_savings: usize,
}

impl Default for CompactionSettings {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            recent_window: default_recent_window(),
            keep_anchors: default_keep_anchors(),
            min_messages: default_min_messages(),
            min_savings: default_min_savings(),
        }
    }
}

/// Body of a remote compaction request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactRequest {
    /// Full transcript
    pub messages: Vec<Message>,
    /// Token budget
    pub max_tokens: usize,
    /// Recent messages to keep verbatim
    pub recent_window: usize,
    /// Whether the first user message must survive
    pub keep_anchors: bool,
}

/// Statistics describing one compaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompactionInfo {
    /// Messages before compaction
    pub original_count: usize,
    /// Messages after compaction
    pub compacted_count: usize,
    /// Messages removed
    pub dropped_count: usize,
    /// Anchor messages preserved
    #[serde(default)]
    pub anchor_count: usize,
    /// Estimated tokens removed
    pub tokens_saved: i64,
    /// Compacted tokens divided by original tokens
    pub compression_ratio: f64,
}

impl CompactionInfo {
    /// Computes statistics for `compacted` as a view of `original`.
    pub fn between(original: &[Message], compacted: &[Message]) -> Self {
        let original_tokens = estimate_tokens(original);
        let compacted_tokens = estimate_tokens(compacted);
        let compression_ratio = if original_tokens == 0 {
            1.0
        } else {
            compacted_tokens as f64 / original_tokens as f64
        };
        let anchor_count = usize::from(
            !original.is_empty()
                && original[0].role == Role::User
                && compacted.first() == original.first()
                && compacted.len() < original.len(),
        );

        Self {
            original_count: original.len(),
            compacted_count: compacted.len(),
            dropped_count: original.len().saturating_sub(compacted.len()),
            anchor_count,
            tokens_saved: original_tokens as i64 - compacted_tokens as i64,
            compression_ratio,
        }
    }
}

/// Body of a remote compaction response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactResponse {
    /// Compacted transcript
    pub messages: Vec<Message>,
    /// Optional server-side summary of the dropped span
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<serde_json::Value>,
    /// Server's token estimate of `messages`
    #[serde(default)]
    pub token_estimate: usize,
    /// Compaction statistics
    #[serde(default)]
    pub compaction_info: CompactionInfo,
}

/// A compaction capability hosted outside this process.
#[async_trait::async_trait]
pub trait RemoteCompactor: Send + Sync + std::fmt::Debug {
    /// Compacts `request.messages` remotely.
    ///
    /// # Errors
    ///
    /// Returns an error on any transport or decoding failure.
    async fn compact(&self, request: &CompactRequest) -> Result<CompactResponse>;
}

/// Anchor plus recent-window view of `messages`.
///
/// Pure function backing the local path; it applies no worthiness checks.
///
/// # Examples
///
/// ```
/// use mcpilot::agent::compaction::compact_locally;
/// use mcpilot::providers::Message;
///
/// let messages: Vec<Message> = (0..10)
///     .map(|i| if i % 2 == 0 { Message::user(format!("u{i}")) } else { Message::assistant(format!("a{i}")) })
///     .collect();
/// let view = compact_locally(&messages, 2, true);
/// assert_eq!(view, vec![messages[0].clone(), messages[8].clone(), messages[9].clone()]);
/// ```
pub fn compact_locally(messages: &[Message], recent_window: usize, keep_anchor: bool) -> Vec<Message> {
    let len = messages.len();
    if len <= recent_window + 1 {
        return messages.to_vec();
    }

    let mut start = len - recent_window;
    if start > 0
        && start < len
        && messages[start].is_tool_results()
        && messages[start - 1].is_tool_uses()
    {
        start -= 1;
    }

    let anchored = keep_anchor && messages[0].role == Role::User && start > 0;
    let mut view = Vec::with_capacity(len - start + usize::from(anchored));
    if anchored {
        view.push(messages[0].clone());
    }
    view.extend_from_slice(&messages[start..]);
    view
}

/// Builds the per-call transcript view.
#[derive(Debug, Clone, Default)]
pub struct Compactor {
    settings: CompactionSettings,
    remote: Option<Arc<dyn RemoteCompactor>>,
}

impl Compactor {
    /// Creates a compactor with the local path only
    pub fn new(settings: CompactionSettings) -> Self {
        Self {
            settings,
            remote: None,
        }
    }

    /// Adds (or clears) the remote compaction capability
    pub fn with_remote(mut self, remote: Option<Arc<dyn RemoteCompactor>>) -> Self {
        self.remote = remote;
        self
    }

    /// Active settings
    pub fn settings(&self) -> &CompactionSettings {
        &self.settings
    }

    /// Returns the view of `messages` to send to the model.
    pub async fn compact(&self, messages: &[Message]) -> Vec<Message> {
        let settings = &self.settings;
        if messages.len() < settings.min_messages {
            return messages.to_vec();
        }

        let smallest_view = 1 + settings.recent_window;
        if messages.len().saturating_sub(smallest_view) < settings.min_savings {
            debug!(
                "compaction skipped: {} messages, window {}",
                messages.len(),
                settings.recent_window
            );
            return messages.to_vec();
        }

        if let Some(remote) = &self.remote {
            if let Some(view) = self.compact_remotely(remote.as_ref(), messages).await {
                return view;
            }
        }

        let view = compact_locally(messages, settings.recent_window, settings.keep_anchors);
        if messages.len().saturating_sub(view.len()) < settings.min_savings {
            debug!(
                "local compaction would drop only {} messages, sending full transcript",
                messages.len().saturating_sub(view.len())
            );
            return messages.to_vec();
        }

        let info = CompactionInfo::between(messages, &view);
        debug!(
            "local compaction: {} -> {} messages, ~{} tokens saved (ratio {:.2})",
            info.original_count, info.compacted_count, info.tokens_saved, info.compression_ratio
        );
        view
    }

    async fn compact_remotely(
        &self,
        remote: &dyn RemoteCompactor,
        messages: &[Message],
    ) -> Option<Vec<Message>> {
        let request = CompactRequest {
            messages: messages.to_vec(),
            max_tokens: self.settings.max_tokens,
            recent_window: self.settings.recent_window,
            keep_anchors: true,
        };

        let response = match remote.compact(&request).await {
            Ok(response) => response,
            Err(e) => {
                debug!("remote compaction failed, using local: {}", e);
                return None;
            }
        };

        let dropped = messages.len().saturating_sub(response.messages.len());
        if dropped < self.settings.min_savings {
            debug!(
                "remote compaction dropped only {} messages, using local",
                dropped
            );
            return None;
        }

        debug!(
            "remote compaction: {} -> {} messages, ~{} tokens saved",
            messages.len(),
            response.messages.len(),
            response.compaction_info.tokens_saved
        );
        Some(response.messages)
    }
}
