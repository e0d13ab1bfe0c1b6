//! Unified error handling for the client SDK.
//!
//! Each module defines its own narrow error type; `ClientError` is the
//! surface callers see. A 401 healed by the silent-refresh path never shows
//! up here — it is absorbed inside the session manager.

use thiserror::Error;

use crate::config::ConfigError;
use crate::store::StoreError;

/// Top-level error type for SDK operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure. Surfaced to the caller, never auto-retried.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The session could not be recovered; credentials have been cleared.
    #[error("session invalid, credentials cleared")]
    SessionInvalid,

    /// The backend rejected the request with a non-auth error.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The backend throttled the request (HTTP 429).
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// A response body failed to decode.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Persistent key-value storage failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "API error (500): boom");

        let err = ClientError::RateLimited("wait a minute".to_string());
        assert_eq!(err.to_string(), "rate limited: wait a minute");

        assert_eq!(
            ClientError::SessionInvalid.to_string(),
            "session invalid, credentials cleared"
        );
    }
}
