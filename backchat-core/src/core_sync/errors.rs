//! Error types shared by the sync engines
//!
//! The taxonomy every engine operation reports through:
//! - Validation: rejected before any remote call
//! - Conflict: a pre-check query found a duplicate
//! - Permission: role/creator checks failed
//! - Remote: a gateway call failed
//!
//! Operations return `SyncResult<T>`; nothing panics across the engine
//! boundary.

use crate::core_gateway::GatewayError;
use thiserror::Error;

/// Result type for sync engine operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by the sync engines
#[derive(Error, Debug)]
pub enum SyncError {
    /// Input rejected before any remote call was made
    #[error("Validation error: {0}")]
    Validation(String),

    /// A duplicate record already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The caller is not allowed to perform this mutation
    #[error("Permission denied: {0}")]
    Permission(String),

    /// The remote store call failed
    #[error("Remote store failure: {0}")]
    Remote(#[from] GatewayError),
}

impl SyncError {
    pub fn validation(msg: impl Into<String>) -> Self {
        SyncError::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        SyncError::Conflict(msg.into())
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        SyncError::Permission(msg.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, SyncError::Conflict(_))
    }

    pub fn is_permission(&self) -> bool {
        matches!(self, SyncError::Permission(_))
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Remote(GatewayError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyncError::validation("message content is empty");
        assert_eq!(err.to_string(), "Validation error: message content is empty");

        let err = SyncError::permission("only the group creator may change roles");
        assert!(err.is_permission());
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_gateway_error_converts() {
        let err: SyncError = GatewayError::Remote("boom".to_string()).into();
        assert!(matches!(err, SyncError::Remote(_)));
    }
}
