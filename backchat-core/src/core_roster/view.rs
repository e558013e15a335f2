/*
 * Read models for the relationship engines.
 *
 * Raw friendship and membership rows are join rows; these views carry
 * the counterpart profile (or group) the UI actually renders, with the
 * viewer-relative fields already computed.
 */

use crate::core_model::{
    Friendship, FriendshipId, Group, GroupMembership, GroupRole, Timestamp, UserId, UserProfile,
};

/// An accepted friendship, seen from the viewer's side
#[derive(Debug, Clone, PartialEq)]
pub struct FriendView {
    pub friendship_id: FriendshipId,
    /// The other party
    pub friend: UserProfile,
    pub since: Timestamp,
}

/// An incoming pending friend request
#[derive(Debug, Clone, PartialEq)]
pub struct FriendRequestView {
    pub friendship_id: FriendshipId,
    /// Who sent it
    pub sender: UserProfile,
    pub sent_at: Timestamp,
}

/// A group the viewer belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct GroupView {
    pub group: Group,
    /// The viewer's own role in this group
    pub role: GroupRole,
    pub is_creator: bool,
    pub joined_at: Timestamp,
}

/// One member of a group, with the profile resolved where available
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMemberView {
    pub membership: GroupMembership,
    pub profile: Option<UserProfile>,
}

impl FriendView {
    /// Build the viewer-relative view, or None when the row does not
    /// involve the viewer at all.
    pub fn from_parts(
        viewer: &UserId,
        friendship: &Friendship,
        counterpart: UserProfile,
    ) -> Option<Self> {
        if !friendship.involves(viewer) {
            return None;
        }
        Some(FriendView {
            friendship_id: friendship.id.clone(),
            friend: counterpart,
            since: friendship.created_at,
        })
    }
}

impl GroupView {
    pub fn from_parts(viewer: &UserId, group: Group, membership: &GroupMembership) -> Self {
        let is_creator = group.is_creator(viewer);
        GroupView {
            group,
            role: membership.role,
            is_creator,
            joined_at: membership.joined_at,
        }
    }
}

impl GroupMemberView {
    pub fn display_name(&self) -> &str {
        match &self.profile {
            Some(profile) => &profile.username,
            None => self.membership.user_id.as_str(),
        }
    }
}
