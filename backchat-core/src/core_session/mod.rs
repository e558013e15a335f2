//! Session context
//!
//! Holds the identity the sync engines build their filters from. The
//! authentication collaborator owns sign-in and sign-out; whatever
//! adapter wraps it pushes the resulting profile in here, and every
//! engine (plus the UI) observes the change stream.

use crate::core_model::UserProfile;
use crate::core_sync::{SyncError, SyncResult};
use tokio::sync::watch;
use tracing::info;

/// Current authenticated identity, observable by the engines
#[derive(Debug)]
pub struct SessionContext {
    tx: watch::Sender<Option<UserProfile>>,
}

impl SessionContext {
    /// Create a signed-out session context
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        SessionContext { tx }
    }

    /// Create a context that is already signed in (test convenience)
    pub fn signed_in(profile: UserProfile) -> Self {
        let (tx, _rx) = watch::channel(Some(profile));
        SessionContext { tx }
    }

    /// Record a sign-in pushed by the auth collaborator
    pub fn set_user(&self, profile: UserProfile) {
        info!(user_id = %profile.id, "Session signed in");
        self.tx.send_replace(Some(profile));
    }

    /// Record a sign-out
    pub fn clear(&self) {
        info!("Session signed out");
        self.tx.send_replace(None);
    }

    /// Current user, if signed in
    pub fn current_user(&self) -> Option<UserProfile> {
        self.tx.borrow().clone()
    }

    /// Current user, or a validation error when signed out
    pub fn require_user(&self) -> SyncResult<UserProfile> {
        self.current_user()
            .ok_or_else(|| SyncError::validation("no authenticated session"))
    }

    /// Session-change notification stream
    pub fn changes(&self) -> watch::Receiver<Option<UserProfile>> {
        self.tx.subscribe()
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}
