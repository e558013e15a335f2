//! Conversation selector
//!
//! Identifies the single conversation the engine is synchronizing:
//! a direct chat with one peer, or a group. The selector also owns the
//! filter shapes for its bulk load and its two push subscriptions, so
//! the engine never assembles predicates by hand.

use crate::core_gateway::Filter;
use crate::core_model::{GroupId, UserId};
use serde_json::Value;
use std::fmt;

/// Which kind of conversation is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationKind {
    Direct,
    Group,
}

/// The active conversation: a peer user or a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationSelector {
    Direct(UserId),
    Group(GroupId),
}

impl ConversationSelector {
    pub fn kind(&self) -> ConversationKind {
        match self {
            ConversationSelector::Direct(_) => ConversationKind::Direct,
            ConversationSelector::Group(_) => ConversationKind::Group,
        }
    }

    pub fn target_id(&self) -> &str {
        match self {
            ConversationSelector::Direct(user) => user.as_str(),
            ConversationSelector::Group(group) => group.as_str(),
        }
    }

    /// Filter for the initial bulk load of the message history
    pub fn load_filter(&self, me: &UserId) -> Filter {
        match self {
            ConversationSelector::Direct(peer) => Filter::and(vec![
                direct_pair(me, peer),
                Filter::is_null("group_id"),
            ]),
            ConversationSelector::Group(group) => Filter::eq("group_id", group.as_str()),
        }
    }

    /// Filter for the message-insert push subscription
    pub fn message_stream_filter(&self, me: &UserId) -> Filter {
        match self {
            ConversationSelector::Direct(peer) => direct_pair(me, peer),
            ConversationSelector::Group(group) => Filter::eq("group_id", group.as_str()),
        }
    }

    /// Filter for the typing-status push subscription. Direct chats only
    /// watch the peer typing at us; group chats watch everyone but us.
    pub fn typing_stream_filter(&self, me: &UserId) -> Filter {
        match self {
            ConversationSelector::Direct(peer) => Filter::and(vec![
                Filter::eq("user_id", peer.as_str()),
                Filter::eq("recipient_id", me.as_str()),
            ]),
            ConversationSelector::Group(group) => Filter::and(vec![
                Filter::eq("group_id", group.as_str()),
                Filter::neq("user_id", me.as_str()),
            ]),
        }
    }

    /// Filter selecting our own typing record for this conversation
    pub fn own_typing_filter(&self, me: &UserId) -> Filter {
        match self {
            ConversationSelector::Direct(peer) => Filter::and(vec![
                Filter::eq("user_id", me.as_str()),
                Filter::eq("recipient_id", peer.as_str()),
            ]),
            ConversationSelector::Group(group) => Filter::and(vec![
                Filter::eq("user_id", me.as_str()),
                Filter::eq("group_id", group.as_str()),
            ]),
        }
    }

    /// The (recipient_id, group_id) pair for records scoped to this target
    pub fn target_columns(&self) -> (Value, Value) {
        match self {
            ConversationSelector::Direct(peer) => {
                (Value::String(peer.0.clone()), Value::Null)
            }
            ConversationSelector::Group(group) => {
                (Value::Null, Value::String(group.0.clone()))
            }
        }
    }
}

/// Messages exchanged between `me` and `peer`, in either direction
fn direct_pair(me: &UserId, peer: &UserId) -> Filter {
    Filter::or(vec![
        Filter::and(vec![
            Filter::eq("sender_id", me.as_str()),
            Filter::eq("recipient_id", peer.as_str()),
        ]),
        Filter::and(vec![
            Filter::eq("sender_id", peer.as_str()),
            Filter::eq("recipient_id", me.as_str()),
        ]),
    ])
}

impl fmt::Display for ConversationSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationSelector::Direct(user) => write!(f, "direct:{}", user),
            ConversationSelector::Group(group) => write!(f, "group:{}", group),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn me() -> UserId {
        UserId::new("u-1".to_string())
    }

    #[test]
    fn test_direct_load_filter_matches_both_directions() {
        let selector = ConversationSelector::Direct(UserId::new("u-2".to_string()));
        let filter = selector.load_filter(&me());

        let outgoing = json!({ "sender_id": "u-1", "recipient_id": "u-2", "group_id": null });
        let incoming = json!({ "sender_id": "u-2", "recipient_id": "u-1", "group_id": null });
        let other = json!({ "sender_id": "u-3", "recipient_id": "u-1", "group_id": null });
        assert!(filter.matches(&outgoing));
        assert!(filter.matches(&incoming));
        assert!(!filter.matches(&other));
    }

    #[test]
    fn test_direct_load_filter_excludes_group_messages() {
        let selector = ConversationSelector::Direct(UserId::new("u-2".to_string()));
        let filter = selector.load_filter(&me());
        let tagged = json!({ "sender_id": "u-1", "recipient_id": "u-2", "group_id": "g-1" });
        assert!(!filter.matches(&tagged));
    }

    #[test]
    fn test_group_typing_filter_excludes_self() {
        let selector = ConversationSelector::Group(GroupId::new("g-1".to_string()));
        let filter = selector.typing_stream_filter(&me());
        assert!(filter.matches(&json!({ "group_id": "g-1", "user_id": "u-2" })));
        assert!(!filter.matches(&json!({ "group_id": "g-1", "user_id": "u-1" })));
        assert!(!filter.matches(&json!({ "group_id": "g-2", "user_id": "u-2" })));
    }

    #[test]
    fn test_target_columns() {
        let direct = ConversationSelector::Direct(UserId::new("u-2".to_string()));
        assert_eq!(direct.target_columns(), (json!("u-2"), json!(null)));

        let group = ConversationSelector::Group(GroupId::new("g-1".to_string()));
        assert_eq!(group.target_columns(), (json!(null), json!("g-1")));
    }
}
