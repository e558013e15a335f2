//! Data model for the sync layer
//!
//! Typed views over the remote tables. Records are owned by the remote
//! store; everything in this module is a read-through representation
//! decoded from JSON rows.

pub mod friendship;
pub mod group;
pub mod message;
pub mod types;
pub mod typing;
pub mod user;

pub use friendship::{Friendship, FriendshipStatus};
pub use group::{Group, GroupMembership, GroupRole};
pub use message::{Message, MessageTarget};
pub use types::{FriendshipId, GroupId, MembershipId, MessageId, Timestamp, UserId};
pub use typing::{TypingEntry, TypingRow};
pub use user::{Presence, UserProfile};
