//! Error types for the store gateway

use thiserror::Error;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors surfaced by the remote store gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The remote call itself failed (transport, store-side rejection)
    #[error("Remote call failed: {0}")]
    Remote(String),

    /// A row or function the caller named does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A row came back in a shape the model cannot decode
    #[error("Failed to decode record: {0}")]
    Decode(String),

    /// Subscription could not be established or has been torn down
    #[error("Subscription error: {0}")]
    Subscription(String),
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GatewayError::NotFound("messages/m-1".to_string());
        assert_eq!(err.to_string(), "Not found: messages/m-1");

        let err = GatewayError::Remote("connection reset".to_string());
        assert!(err.to_string().contains("Remote call failed"));
    }

    #[test]
    fn test_serde_error_converts_to_decode() {
        let bad: Result<u64, _> = serde_json::from_str("\"notanumber\"");
        let err: GatewayError = bad.unwrap_err().into();
        assert!(matches!(err, GatewayError::Decode(_)));
    }
}
