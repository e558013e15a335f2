//! Conversation Sync Engine
//!
//! Pull-based initial load merged with a push-based message stream for
//! exactly one active conversation, with debounced typing indicators
//! layered on top.

pub mod engine;
pub mod recent;
pub mod selector;
pub mod state;

#[cfg(test)]
mod tests;

pub use engine::ChatEngine;
pub use recent::RecentConversation;
pub use selector::{ConversationKind, ConversationSelector};
pub use state::{ChatPhase, ChatSnapshot, MessageView};
