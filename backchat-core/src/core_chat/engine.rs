//! Conversation sync engine
//!
//! Maintains the message list and typing map for the single active
//! conversation: a pull-based initial load merged with a push-based
//! incremental stream, plus debounced ephemeral typing state on top.
//!
//! Lifecycle: `Idle -> Loading -> Active -> Idle`. Switching the active
//! selector tears the previous subscriptions down completely before the
//! new load starts; an epoch counter discards anything a stale handler
//! might still deliver.

use super::selector::ConversationSelector;
use super::state::{ChatPhase, ChatSnapshot, MessageView};
use crate::config::{Config, SyncConfig};
use crate::core_gateway::{
    tables, ChangeEvent, ChangeKind, Filter, GatewayError, Ordering, StoreGateway, SubscribeSpec,
    SubscriptionHandle,
};
use crate::core_model::{Message, Timestamp, TypingEntry, TypingRow, UserId, UserProfile};
use crate::core_session::SessionContext;
use crate::core_sync::{ObservableState, SyncError, SyncResult};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

type LiveSubs = Vec<(SubscriptionHandle, JoinHandle<()>)>;

struct EngineInner {
    gateway: Arc<dyn StoreGateway>,
    session: Arc<SessionContext>,
    config: SyncConfig,
    state: ObservableState<ChatSnapshot>,
    /// Sender display identities already looked up
    profiles: StdMutex<HashMap<UserId, UserProfile>>,
    /// Bumped on every teardown; handlers from older epochs are inert
    epoch: AtomicU64,
    /// Live subscriptions; the lock also serializes selector changes
    live: Mutex<LiveSubs>,
}

/// Sync engine for the active conversation
#[derive(Clone)]
pub struct ChatEngine {
    inner: Arc<EngineInner>,
}

impl ChatEngine {
    pub fn new(
        gateway: Arc<dyn StoreGateway>,
        session: Arc<SessionContext>,
        config: &Config,
    ) -> Self {
        ChatEngine {
            inner: Arc::new(EngineInner {
                gateway,
                session,
                config: config.sync.clone(),
                state: ObservableState::new(ChatSnapshot::idle()),
                profiles: StdMutex::new(HashMap::new()),
                epoch: AtomicU64::new(0),
                live: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Clone of the current state snapshot
    pub fn snapshot(&self) -> ChatSnapshot {
        self.inner.state.get()
    }

    /// Watch the state for changes
    pub fn watch(&self) -> watch::Receiver<ChatSnapshot> {
        self.inner.state.watch()
    }

    pub(super) fn gateway(&self) -> &Arc<dyn StoreGateway> {
        &self.inner.gateway
    }

    pub(super) fn session(&self) -> &SessionContext {
        &self.inner.session
    }

    /// Switch the active conversation
    ///
    /// The previous conversation's subscriptions are fully torn down
    /// before anything else happens. On load failure the engine ends up
    /// idle with the error surfaced; no partial state is kept.
    pub async fn set_active(&self, selector: ConversationSelector) -> SyncResult<()> {
        let me = self.inner.session.require_user()?;
        let mut live = self.inner.live.lock().await;
        self.teardown(&mut live).await;
        let epoch = self.current_epoch();

        info!(conversation = %selector, "Activating conversation");
        self.inner.state.replace(ChatSnapshot::loading(selector.clone()));

        let views = match self.load_history(&me.id, &selector).await {
            Ok(views) => views,
            Err(e) => {
                error!(conversation = %selector, error = %e, "Initial message load failed");
                self.fail_to_idle(&e);
                return Err(e);
            }
        };

        // Apply the bulk load before the push subscriptions exist, so no
        // handler can observe (or race) the loading state.
        self.inner.state.update(|s| {
            s.phase = ChatPhase::Active;
            s.messages = views;
            s.error = None;
        });

        let message_sub = match self
            .inner
            .gateway
            .subscribe(SubscribeSpec::inserts(
                tables::MESSAGES,
                selector.message_stream_filter(&me.id),
            ))
            .await
        {
            Ok(sub) => sub,
            Err(e) => {
                let e = SyncError::from(e);
                error!(conversation = %selector, error = %e, "Message subscription failed");
                self.fail_to_idle(&e);
                return Err(e);
            }
        };

        let typing_sub = match self
            .inner
            .gateway
            .subscribe(SubscribeSpec::all_changes(
                tables::TYPING_STATUS,
                selector.typing_stream_filter(&me.id),
            ))
            .await
        {
            Ok(sub) => sub,
            Err(e) => {
                let e = SyncError::from(e);
                error!(conversation = %selector, error = %e, "Typing subscription failed");
                if let Err(undo) = self.inner.gateway.unsubscribe(message_sub.handle).await {
                    debug!(error = %undo, "Rollback unsubscribe failed");
                }
                self.fail_to_idle(&e);
                return Err(e);
            }
        };

        live.push((
            message_sub.handle.clone(),
            self.spawn_message_loop(epoch, message_sub.events),
        ));
        live.push((
            typing_sub.handle.clone(),
            self.spawn_typing_loop(epoch, typing_sub.events),
        ));
        Ok(())
    }

    /// Send a message to the active conversation
    ///
    /// No optimistic local apply: the local sequence only grows via the
    /// push path, which also covers our own insert.
    pub async fn send(&self, content: &str) -> SyncResult<Message> {
        let me = self.inner.session.require_user()?;
        let snapshot = self.inner.state.get();
        let selector = match (&snapshot.phase, snapshot.selector.clone()) {
            (ChatPhase::Active, Some(selector)) => selector,
            _ => return Err(SyncError::validation("no active conversation")),
        };
        if content.trim().is_empty() {
            return Err(SyncError::validation("message content is empty"));
        }

        let (recipient_id, group_id) = selector.target_columns();
        let record = json!({
            "sender_id": me.id,
            "recipient_id": recipient_id,
            "group_id": group_id,
            "content": content,
            "created_at": Timestamp::now(),
            "read": false,
        });

        let row = match self.inner.gateway.insert(tables::MESSAGES, record).await {
            Ok(row) => row,
            Err(e) => {
                error!(conversation = %selector, error = %e, "Failed to send message");
                return Err(e.into());
            }
        };
        let message: Message = serde_json::from_value(row)?;

        // Sending implies we stopped typing
        if let Err(e) = self
            .inner
            .gateway
            .delete(tables::TYPING_STATUS, selector.own_typing_filter(&me.id))
            .await
        {
            warn!(conversation = %selector, error = %e, "Failed to clear typing status after send");
            return Err(e.into());
        }

        debug!(message_id = %message.id, conversation = %selector, "Message sent");
        Ok(message)
    }

    /// Publish or retract our own typing indicator
    ///
    /// No-op when no conversation is active.
    pub async fn set_typing(&self, is_typing: bool) -> SyncResult<()> {
        let me = self.inner.session.require_user()?;
        let snapshot = self.inner.state.get();
        let selector = match (snapshot.phase, snapshot.selector) {
            (ChatPhase::Active, Some(selector)) => selector,
            _ => return Ok(()),
        };

        let result = if is_typing {
            let (recipient_id, group_id) = selector.target_columns();
            let record = json!({
                "user_id": me.id,
                "recipient_id": recipient_id,
                "group_id": group_id,
                "updated_at": Timestamp::now(),
            });
            self.inner
                .gateway
                .upsert(
                    tables::TYPING_STATUS,
                    record,
                    &["user_id", "recipient_id", "group_id"],
                )
                .await
                .map(|_| ())
        } else {
            self.inner
                .gateway
                .delete(tables::TYPING_STATUS, selector.own_typing_filter(&me.id))
                .await
                .map(|_| ())
        };

        result.map_err(|e| {
            warn!(conversation = %selector, error = %e, "Failed to update typing status");
            e.into()
        })
    }

    /// Mark the peer's unread messages as read
    ///
    /// Direct conversations only. Group read tracking needs a per-member
    /// read cursor table and is not implemented; the call is a no-op
    /// there rather than an error.
    pub async fn mark_read(&self) -> SyncResult<()> {
        let me = self.inner.session.require_user()?;
        let snapshot = self.inner.state.get();
        match snapshot.selector {
            Some(ConversationSelector::Direct(peer)) => {
                let filter = Filter::and(vec![
                    Filter::eq("sender_id", peer.as_str()),
                    Filter::eq("recipient_id", me.id.as_str()),
                    Filter::eq("read", false),
                ]);
                self.inner
                    .gateway
                    .update(tables::MESSAGES, filter, json!({ "read": true }))
                    .await
                    .map(|_| ())
                    .map_err(|e| {
                        warn!(error = %e, "Failed to mark messages read");
                        e.into()
                    })
            }
            Some(ConversationSelector::Group(_)) => {
                debug!("Group read tracking not implemented");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Tear down subscriptions and return to idle
    pub async fn close(&self) {
        let mut live = self.inner.live.lock().await;
        self.teardown(&mut live).await;
        self.inner.state.replace(ChatSnapshot::idle());
        info!("Conversation closed");
    }

    /// Full reset: close and drop cached profiles (used on sign-out)
    pub async fn reset(&self) {
        self.close().await;
        self.inner.profiles.lock().unwrap().clear();
    }

    fn current_epoch(&self) -> u64 {
        self.inner.epoch.load(AtomicOrdering::SeqCst)
    }

    fn fail_to_idle(&self, error: &SyncError) {
        let message = error.to_string();
        self.inner.state.update(|s| {
            *s = ChatSnapshot::idle();
            s.error = Some(message);
        });
    }

    async fn teardown(&self, live: &mut LiveSubs) {
        self.inner.epoch.fetch_add(1, AtomicOrdering::SeqCst);
        for (handle, task) in live.drain(..) {
            task.abort();
            if let Err(e) = self.inner.gateway.unsubscribe(handle).await {
                debug!(error = %e, "Unsubscribe during teardown failed");
            }
        }
    }

    async fn load_history(
        &self,
        me: &UserId,
        selector: &ConversationSelector,
    ) -> SyncResult<Vec<MessageView>> {
        let rows = self
            .inner
            .gateway
            .query(
                tables::MESSAGES,
                selector.load_filter(me),
                Some(Ordering::ascending("created_at")),
                None,
            )
            .await?;

        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            let message: Message = serde_json::from_value(row)?;
            if !message.is_well_formed() {
                return Err(GatewayError::Decode(format!(
                    "message {} must target exactly one of recipient or group",
                    message.id
                ))
                .into());
            }
            let sender = self.resolve_profile(&message.sender_id).await;
            views.push(MessageView { message, sender });
        }
        Ok(views)
    }

    /// Look up a sender's display identity, caching hits
    pub(super) async fn resolve_profile(&self, user: &UserId) -> Option<UserProfile> {
        {
            let cache = self.inner.profiles.lock().unwrap();
            if let Some(profile) = cache.get(user) {
                return Some(profile.clone());
            }
        }

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

        let profile: UserProfile = match rows.into_iter().next() {
            Some(row) => match serde_json::from_value(row) {
                Ok(profile) => profile,
                Err(e) => {
                    warn!(user_id = %user, error = %e, "Profile row malformed");
                    return None;
                }
            },
            None => {
                debug!(user_id = %user, "No profile row for sender");
                return None;
            }
        };

        self.inner
            .profiles
            .lock()
            .unwrap()
            .insert(user.clone(), profile.clone());
        Some(profile)
    }

    fn spawn_message_loop(
        &self,
        epoch: u64,
        mut events: mpsc::UnboundedReceiver<ChangeEvent>,
    ) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                engine.on_message_event(epoch, event).await;
            }
        })
    }

    fn spawn_typing_loop(
        &self,
        epoch: u64,
        mut events: mpsc::UnboundedReceiver<ChangeEvent>,
    ) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                engine.on_typing_event(epoch, event);
            }
        })
    }

    async fn on_message_event(&self, epoch: u64, event: ChangeEvent) {
        if self.current_epoch() != epoch {
            return;
        }
        let Some(row) = event.new else { return };
        let message: Message = match serde_json::from_value(row) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Dropping malformed pushed message");
                return;
            }
        };
        if !message.is_well_formed() {
            warn!(message_id = %message.id, "Dropping pushed message with bad target");
            return;
        }

        // The load/subscribe overlap window can deliver a message we
        // already have from the bulk fetch.
        if self.inner.config.dedupe_messages && self.inner.state.get().contains_message(&message.id)
        {
            debug!(message_id = %message.id, "Suppressing duplicate pushed message");
            return;
        }

        let sender = self.resolve_profile(&message.sender_id).await;
        let dedupe = self.inner.config.dedupe_messages;
        if self.current_epoch() != epoch {
            // The selector changed while we were resolving the sender
            return;
        }
        self.inner.state.update(|s| {
            if s.phase != ChatPhase::Active {
                return;
            }
            if dedupe && s.messages.iter().any(|v| v.message.id == message.id) {
                return;
            }
            s.messages.push(MessageView { message, sender });
        });
    }

    fn on_typing_event(&self, epoch: u64, event: ChangeEvent) {
        if self.current_epoch() != epoch {
            return;
        }
        match event.kind {
            ChangeKind::Insert | ChangeKind::Update => {
                let Some(row) = event.new else { return };
                let typing: TypingRow = match serde_json::from_value(row) {
                    Ok(typing) => typing,
                    Err(e) => {
                        warn!(error = %e, "Dropping malformed typing event");
                        return;
                    }
                };
                let entry = TypingEntry::typing_now();
                let stamp = entry.last_update;
                let user = typing.user_id.clone();
                self.inner.state.update(|s| {
                    s.typing.insert(typing.user_id, entry);
                });
                self.schedule_typing_decay(epoch, user, stamp);
            }
            ChangeKind::Delete => {
                let Some(row) = event.old else { return };
                let typing: TypingRow = match serde_json::from_value(row) {
                    Ok(typing) => typing,
                    Err(e) => {
                        warn!(error = %e, "Dropping malformed typing delete");
                        return;
                    }
                };
                self.inner.state.update(|s| {
                    s.typing.insert(typing.user_id, TypingEntry::stopped());
                });
            }
        }
    }

    /// Last-update-wins debounce: the delayed check only flips the flag
    /// if no newer typing event arrived in the meantime.
    fn schedule_typing_decay(&self, epoch: u64, user: UserId, stamp: Instant) {
        let engine = self.clone();
        let debounce = self.inner.config.typing_debounce;
        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if engine.current_epoch() != epoch {
                return;
            }
            engine.inner.state.update(|s| {
                if let Some(entry) = s.typing.get_mut(&user) {
                    if entry.is_typing && entry.last_update <= stamp {
                        entry.is_typing = false;
                        entry.last_update = Instant::now();
                    }
                }
            });
        });
    }
}
