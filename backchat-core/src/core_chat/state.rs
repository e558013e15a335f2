//! Observable state for the conversation engine

use super::selector::ConversationSelector;
use crate::core_model::{Message, MessageId, TypingEntry, UserId, UserProfile};
use std::collections::HashMap;

/// Engine lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    /// No active conversation
    Idle,
    /// Initial bulk fetch in flight
    Loading,
    /// Subscriptions live, message sequence populated
    Active,
}

/// A message plus its sender's resolved display identity
#[derive(Debug, Clone, PartialEq)]
pub struct MessageView {
    pub message: Message,
    /// None when the sender profile lookup failed
    pub sender: Option<UserProfile>,
}

/// Snapshot of the conversation engine state, as exposed to the UI
#[derive(Debug, Clone)]
pub struct ChatSnapshot {
    pub phase: ChatPhase,
    pub selector: Option<ConversationSelector>,
    /// Messages ordered ascending by creation time
    pub messages: Vec<MessageView>,
    /// Per-user typing indicators for the active conversation
    pub typing: HashMap<UserId, TypingEntry>,
    pub error: Option<String>,
}

impl ChatSnapshot {
    pub fn idle() -> Self {
        ChatSnapshot {
            phase: ChatPhase::Idle,
            selector: None,
            messages: Vec::new(),
            typing: HashMap::new(),
            error: None,
        }
    }

    pub fn loading(selector: ConversationSelector) -> Self {
        ChatSnapshot {
            phase: ChatPhase::Loading,
            selector: Some(selector),
            messages: Vec::new(),
            typing: HashMap::new(),
            error: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase == ChatPhase::Active
    }

    pub fn contains_message(&self, id: &MessageId) -> bool {
        self.messages.iter().any(|view| &view.message.id == id)
    }

    /// Users currently showing as typing
    pub fn typing_users(&self) -> Vec<UserId> {
        self.typing
            .iter()
            .filter(|(_, entry)| entry.is_typing)
            .map(|(user, _)| user.clone())
            .collect()
    }
}

impl Default for ChatSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_model::Timestamp;

    fn message(id: &str) -> Message {
        Message {
            id: MessageId::new(id.to_string()),
            sender_id: UserId::new("u-1".to_string()),
            recipient_id: Some(UserId::new("u-2".to_string())),
            group_id: None,
            content: "hi".to_string(),
            created_at: Timestamp::from_millis(1),
            read: false,
        }
    }

    #[test]
    fn test_contains_message() {
        let mut snapshot = ChatSnapshot::idle();
        snapshot.messages.push(MessageView {
            message: message("m-1"),
            sender: None,
        });
        assert!(snapshot.contains_message(&MessageId::new("m-1".to_string())));
        assert!(!snapshot.contains_message(&MessageId::new("m-2".to_string())));
    }

    #[tokio::test]
    async fn test_typing_users_filters_stopped() {
        let mut snapshot = ChatSnapshot::idle();
        snapshot
            .typing
            .insert(UserId::new("u-2".to_string()), TypingEntry::typing_now());
        snapshot
            .typing
            .insert(UserId::new("u-3".to_string()), TypingEntry::stopped());
        assert_eq!(snapshot.typing_users(), vec![UserId::new("u-2".to_string())]);
    }
}
