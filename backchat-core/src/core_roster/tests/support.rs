//! Shared fixtures for relationship engine tests

use crate::config::Config;
use crate::core_gateway::{InMemoryGateway, StoreGateway};
use crate::core_model::{UserId, UserProfile};
use crate::core_roster::{FriendsEngine, GroupsEngine};
use crate::core_session::SessionContext;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct Harness {
    pub gateway: Arc<InMemoryGateway>,
    pub friends: FriendsEngine,
    pub groups: GroupsEngine,
}

/// Both engines wired to an in-memory gateway, signed in as `me`
pub fn harness(me: &str) -> Harness {
    let gateway = Arc::new(InMemoryGateway::new());
    with_gateway(gateway, me)
}

/// A second viewpoint on an existing store
pub fn with_gateway(gateway: Arc<InMemoryGateway>, me: &str) -> Harness {
    let profile = UserProfile::new(UserId::new(me.to_string()), me.to_string());
    let session = Arc::new(SessionContext::signed_in(profile));
    let friends = FriendsEngine::new(
        gateway.clone() as Arc<dyn StoreGateway>,
        session.clone(),
        &Config::default(),
    );
    let groups = GroupsEngine::new(gateway.clone() as Arc<dyn StoreGateway>, session);
    Harness {
        gateway,
        friends,
        groups,
    }
}

pub fn uid(id: &str) -> UserId {
    UserId::new(id.to_string())
}

pub fn user_row(id: &str, username: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "avatar_url": null,
        "status": "offline",
    })
}

pub fn friendship_row(id: &str, user1: &str, user2: &str, status: &str) -> Value {
    json!({
        "id": id,
        "user1": user1,
        "user2": user2,
        "status": status,
        "created_at": 1_000,
    })
}

pub fn group_row(id: &str, name: &str, creator: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": null,
        "creator_id": creator,
        "created_at": 1_000,
    })
}

pub fn membership_row(id: &str, group: &str, user: &str, role: &str) -> Value {
    json!({
        "id": id,
        "group_id": group,
        "user_id": user,
        "role": role,
        "joined_at": 1_000,
    })
}

/// Let the subscription loops and any spawned handlers run
pub async fn drain() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
