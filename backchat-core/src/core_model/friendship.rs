/*
    friendship.rs - Friendship record

    A friendship row joins two users. While pending the row is directed
    (user1 is the requester); once accepted it is undirected. At most
    one row exists per unordered pair of users.
*/

use super::types::{FriendshipId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Lifecycle of a friendship record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
}

/// A friendship row from the `friendships` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Friendship {
    pub id: FriendshipId,

    /// Requester while pending; one side of the pair once accepted
    pub user1: UserId,

    /// Addressee while pending
    pub user2: UserId,

    pub status: FriendshipStatus,

    pub created_at: Timestamp,
}

impl Friendship {
    /// Whether the given user is one side of this friendship
    pub fn involves(&self, user: &UserId) -> bool {
        &self.user1 == user || &self.user2 == user
    }

    /// The other side of the pair, from `viewer`'s perspective
    pub fn counterpart(&self, viewer: &UserId) -> &UserId {
        if &self.user1 == viewer {
            &self.user2
        } else {
            &self.user1
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == FriendshipStatus::Accepted
    }
}
