//! Error types for feedseal core.

use thiserror::Error;

/// Core errors raised by signing and key management.
///
/// Verification never produces these: a malformed key or signature seen while
/// verifying is reported as a failed verification, not as an error.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("invalid signature format: {0}")]
    InvalidSignatureFormat(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("no key registered for owner {0:?}")]
    KeyNotFound(String),

    #[error("key for owner {0:?} has been deleted")]
    KeyInactive(String),

    #[error("owner {0:?} already has an active key")]
    KeyExists(String),

    #[error("metrics export failed: {0}")]
    Metrics(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
