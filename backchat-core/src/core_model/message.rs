/*
    message.rs - Message record

    Represents a single chat message, direct or group.

    Invariant: exactly one of recipient_id / group_id is set. Messages
    are created by the send operation and never mutated afterwards
    except for the `read` flag; this layer never deletes them.
*/

use super::types::{GroupId, MessageId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// The target of a message: a peer user or a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageTarget {
    Direct(UserId),
    Group(GroupId),
}

/// A chat message as stored in the `messages` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: MessageId,

    /// User who sent this message
    pub sender_id: UserId,

    /// Recipient for direct messages
    #[serde(default)]
    pub recipient_id: Option<UserId>,

    /// Group tag for group messages
    #[serde(default)]
    pub group_id: Option<GroupId>,

    /// Message body
    pub content: String,

    /// When the message was created (sender's clock)
    pub created_at: Timestamp,

    /// Whether the recipient has read the message (direct chats only)
    #[serde(default)]
    pub read: bool,
}

impl Message {
    /// Check the direct-XOR-group invariant
    pub fn is_well_formed(&self) -> bool {
        self.recipient_id.is_some() != self.group_id.is_some()
    }

    pub fn is_direct(&self) -> bool {
        self.recipient_id.is_some()
    }

    /// Resolve the message target, if well formed
    pub fn target(&self) -> Option<MessageTarget> {
        match (&self.recipient_id, &self.group_id) {
            (Some(user), None) => Some(MessageTarget::Direct(user.clone())),
            (None, Some(group)) => Some(MessageTarget::Group(group.clone())),
            _ => None,
        }
    }
}
