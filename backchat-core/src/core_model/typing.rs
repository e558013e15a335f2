/*
    typing.rs - Typing indicator records

    Two shapes:
    - TypingRow: the short-lived record stored remotely, scoped to a
      (user, target) pair. Upserted while the user types, deleted when
      they stop or send.
    - TypingEntry: the local, in-memory view held by the conversation
      engine. Decays to not-typing after a quiet window measured on the
      monotonic clock.
*/

use super::types::{GroupId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Remote typing-status record from the `typing_status` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingRow {
    #[serde(default)]
    pub id: Option<String>,

    /// The user who is typing
    pub user_id: UserId,

    /// Set for direct conversations: the peer being typed at
    #[serde(default)]
    pub recipient_id: Option<UserId>,

    /// Set for group conversations
    #[serde(default)]
    pub group_id: Option<GroupId>,

    /// Last keystroke, sender's clock
    pub updated_at: Timestamp,
}

/// Local typing state for one user in the active conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingEntry {
    pub is_typing: bool,

    /// When the last typing event for this user was observed locally.
    /// Monotonic, so the debounce check survives wall-clock jumps.
    pub last_update: Instant,
}

impl TypingEntry {
    pub fn typing_now() -> Self {
        TypingEntry {
            is_typing: true,
            last_update: Instant::now(),
        }
    }

    pub fn stopped() -> Self {
        TypingEntry {
            is_typing: false,
            last_update: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_typing_row_decodes_direct_scope() {
        let row = json!({
            "id": "t-1",
            "user_id": "u-1",
            "recipient_id": "u-2",
            "updated_at": 5_000,
        });
        let typing: TypingRow = serde_json::from_value(row).unwrap();
        assert_eq!(typing.recipient_id, Some(UserId::new("u-2".to_string())));
        assert_eq!(typing.group_id, None);
    }

    #[tokio::test]
    async fn test_entry_constructors() {
        assert!(TypingEntry::typing_now().is_typing);
        assert!(!TypingEntry::stopped().is_typing);
    }
}
