/*
    group.rs - Group and group membership records

    A group is created by one user (the creator) and carries a
    membership row per participant. The creator always holds an
    implicit admin capability: their role can never be changed and
    only they may delete the group or change other members' roles.
*/

use super::types::{GroupId, MembershipId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Member role inside a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    Admin,
    Member,
}

/// A group row from the `groups` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// The user who created the group; implicit admin forever
    pub creator_id: UserId,

    pub created_at: Timestamp,
}

impl Group {
    pub fn is_creator(&self, user: &UserId) -> bool {
        &self.creator_id == user
    }
}

/// A membership row from the `group_members` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub id: MembershipId,

    pub group_id: GroupId,

    pub user_id: UserId,

    pub role: GroupRole,

    pub joined_at: Timestamp,
}

impl GroupMembership {
    pub fn is_admin(&self) -> bool {
        self.role == GroupRole::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(GroupRole::Admin).unwrap(), json!("admin"));
        assert_eq!(serde_json::to_value(GroupRole::Member).unwrap(), json!("member"));
    }

    #[test]
    fn test_creator_check() {
        let group = Group {
            id: GroupId::new("g-1".to_string()),
            name: "rust".to_string(),
            description: None,
            creator_id: UserId::new("u-1".to_string()),
            created_at: Timestamp::from_millis(0),
        };
        assert!(group.is_creator(&UserId::new("u-1".to_string())));
        assert!(!group.is_creator(&UserId::new("u-2".to_string())));
    }

    #[test]
    fn test_membership_decodes_from_row() {
        let row = json!({
            "id": "gm-1",
            "group_id": "g-1",
            "user_id": "u-1",
            "role": "member",
            "joined_at": 42,
        });
        let membership: GroupMembership = serde_json::from_value(row).unwrap();
        assert!(!membership.is_admin());
        assert_eq!(membership.group_id, GroupId::new("g-1".to_string()));
    }
}
