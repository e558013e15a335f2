//! Recent conversations
//!
//! The conversation list shown before anything is active: the latest
//! message per direct peer and per group, with unread counts. Both come
//! from store-side functions (`get_latest_direct_messages`,
//! `get_latest_group_messages`) because the aggregation is a windowed
//! query the plain CRUD surface cannot express.

use super::engine::ChatEngine;
use super::selector::ConversationKind;
use crate::core_gateway::GatewayError;
use crate::core_model::{Timestamp, UserId};
use crate::core_sync::SyncResult;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

/// One entry in the recent-conversations list
#[derive(Debug, Clone, PartialEq)]
pub struct RecentConversation {
    pub kind: ConversationKind,
    /// Id of the latest message in the conversation
    pub latest_message_id: String,
    /// Peer user id (direct) or group id (group)
    pub target_id: String,
    /// Peer username or group name
    pub title: String,
    /// Avatar (direct) or description (group), when present
    pub detail: Option<String>,
    /// Latest message body
    pub preview: String,
    pub last_activity: Timestamp,
    pub unread_count: u64,
}

#[derive(Deserialize)]
struct DirectRow {
    conversation_id: String,
    other_user_id: UserId,
    username: String,
    #[serde(default)]
    avatar_url: Option<String>,
    content: String,
    created_at: Timestamp,
    #[serde(default)]
    unread_count: u64,
}

#[derive(Deserialize)]
struct GroupRow {
    conversation_id: String,
    group_id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    content: String,
    created_at: Timestamp,
    #[serde(default)]
    unread_count: u64,
}

impl From<DirectRow> for RecentConversation {
    fn from(row: DirectRow) -> Self {
        RecentConversation {
            kind: ConversationKind::Direct,
            latest_message_id: row.conversation_id,
            target_id: row.other_user_id.0,
            title: row.username,
            detail: row.avatar_url,
            preview: row.content,
            last_activity: row.created_at,
            unread_count: row.unread_count,
        }
    }
}

impl From<GroupRow> for RecentConversation {
    fn from(row: GroupRow) -> Self {
        RecentConversation {
            kind: ConversationKind::Group,
            latest_message_id: row.conversation_id,
            target_id: row.group_id,
            title: row.name,
            detail: row.description,
            preview: row.content,
            last_activity: row.created_at,
            unread_count: row.unread_count,
        }
    }
}

fn rows(value: Value, function: &str) -> Result<Vec<Value>, GatewayError> {
    match value {
        Value::Array(rows) => Ok(rows),
        other => Err(GatewayError::Decode(format!(
            "{} returned {} instead of an array",
            function,
            other
        ))),
    }
}

impl ChatEngine {
    /// Merged direct and group conversation list, most recent first
    pub async fn recent_conversations(&self) -> SyncResult<Vec<RecentConversation>> {
        let me = self.session().require_user()?;
        let params = json!({ "user_id_param": me.id });

        let direct = self
            .gateway()
            .rpc("get_latest_direct_messages", params.clone())
            .await?;
        let group = self
            .gateway()
            .rpc("get_latest_group_messages", params)
            .await?;

        let mut conversations: Vec<RecentConversation> = Vec::new();
        for row in rows(direct, "get_latest_direct_messages")? {
            match serde_json::from_value::<DirectRow>(row) {
                Ok(row) => conversations.push(row.into()),
                Err(e) => warn!(error = %e, "Skipping malformed direct conversation row"),
            }
        }
        for row in rows(group, "get_latest_group_messages")? {
            match serde_json::from_value::<GroupRow>(row) {
                Ok(row) => conversations.push(row.into()),
                Err(e) => warn!(error = %e, "Skipping malformed group conversation row"),
            }
        }

        conversations.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        Ok(conversations)
    }
}
