//! Friendship sync engine
//!
//! Unlike the conversation engine there is no active selection here:
//! the friend list and the incoming request list are whole collections,
//! and any change event triggers a wholesale reload of both. Reloads
//! are idempotent, so a redundant or late reload is harmless.

use super::view::{FriendRequestView, FriendView};
use crate::config::{Config, SearchConfig};
use crate::core_gateway::{tables, Filter, StoreGateway, SubscribeSpec, SubscriptionHandle};
use crate::core_model::{Friendship, FriendshipId, FriendshipStatus, Timestamp, UserId, UserProfile};
use crate::core_session::SessionContext;
use crate::core_sync::{ObservableState, SyncError, SyncResult};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type LiveSubs = Vec<(SubscriptionHandle, JoinHandle<()>)>;

struct FriendsInner {
    gateway: Arc<dyn StoreGateway>,
    session: Arc<SessionContext>,
    search: SearchConfig,
    friends: ObservableState<Vec<FriendView>>,
    requests: ObservableState<Vec<FriendRequestView>>,
    live: Mutex<LiveSubs>,
}

/// Sync engine for friendships and friend requests
#[derive(Clone)]
pub struct FriendsEngine {
    inner: Arc<FriendsInner>,
}

impl FriendsEngine {
    pub fn new(
        gateway: Arc<dyn StoreGateway>,
        session: Arc<SessionContext>,
        config: &Config,
    ) -> Self {
        FriendsEngine {
            inner: Arc::new(FriendsInner {
                gateway,
                session,
                search: config.search.clone(),
                friends: ObservableState::new(Vec::new()),
                requests: ObservableState::new(Vec::new()),
                live: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn friends(&self) -> Vec<FriendView> {
        self.inner.friends.get()
    }

    pub fn requests(&self) -> Vec<FriendRequestView> {
        self.inner.requests.get()
    }

    pub fn watch_friends(&self) -> watch::Receiver<Vec<FriendView>> {
        self.inner.friends.watch()
    }

    pub fn watch_requests(&self) -> watch::Receiver<Vec<FriendRequestView>> {
        self.inner.requests.watch()
    }

    /// Reload the accepted-friends collection
    pub async fn load_friends(&self) -> SyncResult<()> {
        let me = self.inner.session.require_user()?;
        let filter = Filter::and(vec![
            Filter::or(vec![
                Filter::eq("user1", me.id.as_str()),
                Filter::eq("user2", me.id.as_str()),
            ]),
            Filter::eq("status", "accepted"),
        ]);
        let rows = self
            .inner
            .gateway
            .query(tables::FRIENDSHIPS, filter, None, None)
            .await?;

        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            let friendship: Friendship = match serde_json::from_value(row) {
                Ok(friendship) => friendship,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed friendship row");
                    continue;
                }
            };
            let counterpart = friendship.counterpart(&me.id).clone();
            let Some(profile) = self.lookup_profile(&counterpart).await else {
                warn!(user_id = %counterpart, "Skipping friendship with missing profile");
                continue;
            };
            if let Some(view) = FriendView::from_parts(&me.id, &friendship, profile) {
                views.push(view);
            }
        }
        views.sort_by(|a, b| a.friend.username.cmp(&b.friend.username));
        self.inner.friends.replace(views);
        Ok(())
    }

    /// Reload the incoming pending-request collection
    pub async fn load_requests(&self) -> SyncResult<()> {
        let me = self.inner.session.require_user()?;
        let filter = Filter::and(vec![
            Filter::eq("user2", me.id.as_str()),
            Filter::eq("status", "pending"),
        ]);
        let rows = self
            .inner
            .gateway
            .query(tables::FRIENDSHIPS, filter, None, None)
            .await?;

        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            let friendship: Friendship = match serde_json::from_value(row) {
                Ok(friendship) => friendship,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed friendship row");
                    continue;
                }
            };
            let Some(sender) = self.lookup_profile(&friendship.user1).await else {
                warn!(user_id = %friendship.user1, "Skipping request with missing sender profile");
                continue;
            };
            views.push(FriendRequestView {
                friendship_id: friendship.id,
                sender,
                sent_at: friendship.created_at,
            });
        }
        self.inner.requests.replace(views);
        Ok(())
    }

    /// Load both collections and start watching for changes
    ///
    /// Two subscriptions cover the viewer on either side of the pair;
    /// any event on either stream reloads both collections.
    pub async fn subscribe(&self) -> SyncResult<()> {
        let me = self.inner.session.require_user()?;
        let mut live = self.inner.live.lock().await;
        self.teardown(&mut live).await;

        self.load_friends().await?;
        self.load_requests().await?;

        for column in ["user1", "user2"] {
            let sub = self
                .inner
                .gateway
                .subscribe(SubscribeSpec::all_changes(
                    tables::FRIENDSHIPS,
                    Filter::eq(column, me.id.as_str()),
                ))
                .await?;
            let engine = self.clone();
            let mut events = sub.events;
            let task = tokio::spawn(async move {
                while events.recv().await.is_some() {
                    if let Err(e) = engine.load_friends().await {
                        warn!(error = %e, "Friend list reload failed");
                    }
                    if let Err(e) = engine.load_requests().await {
                        warn!(error = %e, "Friend request reload failed");
                    }
                }
            });
            live.push((sub.handle, task));
        }
        info!(user_id = %me.id, "Friendship sync started");
        Ok(())
    }

    /// Send a friend request to `target`
    ///
    /// The duplicate pre-check queries both orders of the pair before
    /// inserting; check-then-insert is not atomic against a concurrent
    /// request from the other side, the remote store's unique pair
    /// constraint is the real guard.
    pub async fn send_friend_request(&self, target: &UserId) -> SyncResult<Friendship> {
        let me = self.inner.session.require_user()?;
        if &me.id == target {
            return Err(SyncError::validation("cannot befriend yourself"));
        }

        let existing = self
            .inner
            .gateway
            .query(tables::FRIENDSHIPS, pair_filter(&me.id, target), None, Some(1))
            .await?;
        if let Some(row) = existing.into_iter().next() {
            let friendship: Friendship = serde_json::from_value(row)?;
            return Err(if friendship.is_accepted() {
                SyncError::conflict("already friends")
            } else {
                SyncError::conflict("friend request already pending")
            });
        }

        let record = json!({
            "user1": me.id,
            "user2": target,
            "status": FriendshipStatus::Pending,
            "created_at": Timestamp::now(),
        });
        let row = self.inner.gateway.insert(tables::FRIENDSHIPS, record).await?;
        let friendship: Friendship = serde_json::from_value(row)?;
        info!(friendship_id = %friendship.id, target = %target, "Friend request sent");
        Ok(friendship)
    }

    /// Accept an incoming request
    pub async fn accept_request(&self, id: &FriendshipId) -> SyncResult<()> {
        self.inner.session.require_user()?;
        self.inner
            .gateway
            .update(
                tables::FRIENDSHIPS,
                Filter::eq("id", id.as_str()),
                json!({ "status": FriendshipStatus::Accepted }),
            )
            .await?;
        info!(friendship_id = %id, "Friend request accepted");
        Ok(())
    }

    /// Decline an incoming request (the row is removed)
    pub async fn reject_request(&self, id: &FriendshipId) -> SyncResult<()> {
        self.inner.session.require_user()?;
        self.inner
            .gateway
            .delete(tables::FRIENDSHIPS, Filter::eq("id", id.as_str()))
            .await?;
        info!(friendship_id = %id, "Friend request rejected");
        Ok(())
    }

    /// End a friendship
    pub async fn remove_friend(&self, id: &FriendshipId) -> SyncResult<()> {
        self.inner.session.require_user()?;
        self.inner
            .gateway
            .delete(tables::FRIENDSHIPS, Filter::eq("id", id.as_str()))
            .await?;
        info!(friendship_id = %id, "Friend removed");
        Ok(())
    }

    /// Username search for the add-friend flow
    ///
    /// Short queries return nothing rather than erroring; the viewer is
    /// never in their own results.
    pub async fn search_users(&self, query: &str) -> SyncResult<Vec<UserProfile>> {
        let me = self.inner.session.require_user()?;
        let query = query.trim();
        if query.len() < self.inner.search.min_query_len {
            return Ok(Vec::new());
        }

        let filter = Filter::and(vec![
            Filter::ilike("username", format!("%{}%", query)),
            Filter::neq("id", me.id.as_str()),
        ]);
        let rows = self
            .inner
            .gateway
            .query(
                tables::USERS,
                filter,
                None,
                Some(self.inner.search.max_results),
            )
            .await?;

        let mut profiles = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<UserProfile>(row) {
                Ok(profile) => profiles.push(profile),
                Err(e) => warn!(error = %e, "Skipping malformed user row in search"),
            }
        }
        Ok(profiles)
    }

    /// Stop watching and clear local state (used on sign-out)
    pub async fn close(&self) {
        let mut live = self.inner.live.lock().await;
        self.teardown(&mut live).await;
        self.inner.friends.replace(Vec::new());
        self.inner.requests.replace(Vec::new());
        info!("Friendship sync stopped");
    }

    async fn teardown(&self, live: &mut LiveSubs) {
        for (handle, task) in live.drain(..) {
            task.abort();
            if let Err(e) = self.inner.gateway.unsubscribe(handle).await {
                debug!(error = %e, "Unsubscribe during teardown failed");
            }
        }
    }

    async fn lookup_profile(&self, user: &UserId) -> Option<UserProfile> {
        let rows = match self
            .inner
            .gateway
            .query(tables::USERS, Filter::eq("id", user.as_str()), None, Some(1))
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(user_id = %user, error = %e, "Profile lookup failed");
                return None;
            }
        };
        let row = rows.into_iter().next()?;
        match serde_json::from_value(row) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(user_id = %user, error = %e, "Profile row malformed");
                None
            }
        }
    }
}

/// Both orderings of an unordered user pair
fn pair_filter(a: &UserId, b: &UserId) -> Filter {
    Filter::or(vec![
        Filter::and(vec![
            Filter::eq("user1", a.as_str()),
            Filter::eq("user2", b.as_str()),
        ]),
        Filter::and(vec![
            Filter::eq("user1", b.as_str()),
            Filter::eq("user2", a.as_str()),
        ]),
    ])
}
