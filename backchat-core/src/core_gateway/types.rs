//! Wire-level types shared across gateway implementations

use super::filter::Filter;
use serde_json::Value;
use std::fmt;
use tokio::sync::mpsc;

/// Table names used by the sync layer
pub mod tables {
    pub const USERS: &str = "users";
    pub const MESSAGES: &str = "messages";
    pub const TYPING_STATUS: &str = "typing_status";
    pub const FRIENDSHIPS: &str = "friendships";
    pub const GROUPS: &str = "groups";
    pub const GROUP_MEMBERS: &str = "group_members";
}

/// Sort order for a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub column: String,
    pub ascending: bool,
}

impl Ordering {
    pub fn ascending(column: impl Into<String>) -> Self {
        Ordering {
            column: column.into(),
            ascending: true,
        }
    }

    pub fn descending(column: impl Into<String>) -> Self {
        Ordering {
            column: column.into(),
            ascending: false,
        }
    }
}

/// Kind of change carried by a push event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        };
        write!(f, "{}", s)
    }
}

/// A change notification pushed by the store
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub table: String,
    /// Row after the change (insert/update)
    pub new: Option<Value>,
    /// Row before the change (delete; update when the store provides it)
    pub old: Option<Value>,
}

impl ChangeEvent {
    /// The row a filter should be evaluated against
    pub fn row(&self) -> Option<&Value> {
        match self.kind {
            ChangeKind::Insert | ChangeKind::Update => self.new.as_ref(),
            ChangeKind::Delete => self.old.as_ref(),
        }
    }
}

/// What to subscribe to: (table, event kinds, filter)
#[derive(Debug, Clone)]
pub struct SubscribeSpec {
    pub table: String,
    pub kinds: Vec<ChangeKind>,
    pub filter: Filter,
}

impl SubscribeSpec {
    pub fn new(table: impl Into<String>, kinds: Vec<ChangeKind>, filter: Filter) -> Self {
        SubscribeSpec {
            table: table.into(),
            kinds,
            filter,
        }
    }

    /// Shorthand for insert-only subscriptions
    pub fn inserts(table: impl Into<String>, filter: Filter) -> Self {
        Self::new(table, vec![ChangeKind::Insert], filter)
    }

    /// Shorthand for subscriptions to every event kind
    pub fn all_changes(table: impl Into<String>, filter: Filter) -> Self {
        Self::new(
            table,
            vec![ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete],
            filter,
        )
    }
}

/// Opaque handle identifying a live subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub uuid::Uuid);

impl SubscriptionHandle {
    pub fn generate() -> Self {
        SubscriptionHandle(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A live subscription: the handle used to tear it down plus the event
/// stream. Dropping the receiver alone does not unregister the
/// subscription; callers must pass the handle back to `unsubscribe`.
#[derive(Debug)]
pub struct Subscription {
    pub handle: SubscriptionHandle,
    pub events: mpsc::UnboundedReceiver<ChangeEvent>,
}
