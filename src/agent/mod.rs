//! Agent module for mcpilot
//!
//! This module contains the agent logic: the canonical conversation, the
//! compaction engine that builds per-call views of it, the tool-calling
//! loop, the terminal thinking indicator, and the Ctrl-C listener.

pub mod compaction;
pub mod conversation;
pub mod core;
pub mod interrupt;
pub mod thinking;

pub use compaction::{CompactionSettings, Compactor};
pub use conversation::Conversation;
pub use core::Agent;
pub use interrupt::cancel_on_ctrl_c;
