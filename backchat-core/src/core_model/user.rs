/*
    user.rs - User profile record

    Mirrors the remote `users` table: profile fields plus a coarse
    presence status maintained by the auth collaborator.
*/

use super::types::UserId;
use serde::{Deserialize, Serialize};

/// Coarse presence status stored on the user row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Online,
    Offline,
}

/// A user profile as read from the `users` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Unique user ID (assigned by the auth provider)
    pub id: UserId,

    /// Display name, unique per user
    pub username: String,

    /// Optional avatar URL
    #[serde(default)]
    pub avatar_url: Option<String>,

    /// Presence status, absent on rows that predate the column
    #[serde(default)]
    pub status: Option<Presence>,
}

impl UserProfile {
    pub fn new(id: UserId, username: String) -> Self {
        UserProfile {
            id,
            username,
            avatar_url: None,
            status: None,
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self.status, Some(Presence::Online))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_decodes_from_row() {
        let row = json!({
            "id": "u-1",
            "username": "alice",
            "avatar_url": null,
            "status": "online",
        });
        let profile: UserProfile = serde_json::from_value(row).unwrap();
        assert_eq!(profile.username, "alice");
        assert!(profile.is_online());
    }

    #[test]
    fn test_profile_tolerates_missing_optional_fields() {
        let row = json!({ "id": "u-2", "username": "bob" });
        let profile: UserProfile = serde_json::from_value(row).unwrap();
        assert_eq!(profile.avatar_url, None);
        assert!(!profile.is_online());
    }
}
