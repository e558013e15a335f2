//! Shared fixtures for conversation engine tests

use crate::config::Config;
use crate::core_chat::ChatEngine;
use crate::core_gateway::{InMemoryGateway, StoreGateway};
use crate::core_model::{UserId, UserProfile};
use crate::core_session::SessionContext;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct Harness {
    pub gateway: Arc<InMemoryGateway>,
    pub session: Arc<SessionContext>,
    pub engine: ChatEngine,
}

/// Engine wired to an in-memory gateway, signed in as `me`
pub fn harness(me: &str) -> Harness {
    let gateway = Arc::new(InMemoryGateway::new());
    let profile = UserProfile::new(UserId::new(me.to_string()), me.to_string());
    let session = Arc::new(SessionContext::signed_in(profile));
    let engine = ChatEngine::new(
        gateway.clone() as Arc<dyn StoreGateway>,
        session.clone(),
        &Config::default(),
    );
    Harness {
        gateway,
        session,
        engine,
    }
}

pub fn user_row(id: &str, username: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "avatar_url": null,
        "status": "online",
    })
}

pub fn direct_message_row(id: &str, sender: &str, recipient: &str, created_at: u64) -> Value {
    json!({
        "id": id,
        "sender_id": sender,
        "recipient_id": recipient,
        "group_id": null,
        "content": format!("message {}", id),
        "created_at": created_at,
        "read": false,
    })
}

/// Let the subscription loops and any spawned handlers run
pub async fn drain() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
