//! Recent-conversation list: RPC merge and ordering

use super::support::harness;
use crate::core_chat::ConversationKind;
use crate::core_gateway::GatewayError;
use crate::core_sync::SyncError;
use serde_json::json;

fn direct_row(id: &str, other: &str, username: &str, created_at: u64, unread: u64) -> serde_json::Value {
    json!({
        "conversation_id": id,
        "other_user_id": other,
        "username": username,
        "avatar_url": null,
        "content": format!("latest from {}", username),
        "created_at": created_at,
        "unread_count": unread,
    })
}

fn group_row(id: &str, group: &str, name: &str, created_at: u64) -> serde_json::Value {
    json!({
        "conversation_id": id,
        "group_id": group,
        "name": name,
        "description": "standup",
        "content": format!("latest in {}", name),
        "created_at": created_at,
        "unread_count": 0,
    })
}

#[tokio::test]
async fn test_merges_both_projections_most_recent_first() {
    let h = harness("u-1");
    h.gateway.register_rpc(
        "get_latest_direct_messages",
        json!([
            direct_row("m-1", "u-2", "bob", 1_000, 2),
            direct_row("m-5", "u-3", "carol", 5_000, 0),
        ]),
    );
    h.gateway.register_rpc(
        "get_latest_group_messages",
        json!([group_row("m-3", "g-1", "ops", 3_000)]),
    );

    let list = h.engine.recent_conversations().await.unwrap();
    let order: Vec<(ConversationKind, u64)> = list
        .iter()
        .map(|c| (c.kind, c.last_activity.as_millis()))
        .collect();
    assert_eq!(
        order,
        vec![
            (ConversationKind::Direct, 5_000),
            (ConversationKind::Group, 3_000),
            (ConversationKind::Direct, 1_000),
        ]
    );

    assert_eq!(list[0].title, "carol");
    assert_eq!(list[1].target_id, "g-1");
    assert_eq!(list[1].detail.as_deref(), Some("standup"));
    assert_eq!(list[2].unread_count, 2);
}

#[tokio::test]
async fn test_malformed_rows_are_skipped_not_fatal() {
    let h = harness("u-1");
    h.gateway.register_rpc(
        "get_latest_direct_messages",
        json!([
            direct_row("m-1", "u-2", "bob", 1_000, 0),
            { "conversation_id": "m-2" },
        ]),
    );
    h.gateway
        .register_rpc("get_latest_group_messages", json!([]));

    let list = h.engine.recent_conversations().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].title, "bob");
}

#[tokio::test]
async fn test_non_array_projection_is_a_decode_error() {
    let h = harness("u-1");
    h.gateway
        .register_rpc("get_latest_direct_messages", json!({ "rows": [] }));
    h.gateway
        .register_rpc("get_latest_group_messages", json!([]));

    let err = h.engine.recent_conversations().await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::Remote(GatewayError::Decode(_))
    ));
}

#[tokio::test]
async fn test_requires_session() {
    let h = harness("u-1");
    h.session.clear();
    assert!(matches!(
        h.engine.recent_conversations().await,
        Err(SyncError::Validation(_))
    ));
}
