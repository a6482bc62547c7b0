//! Builder error types.

use feedseal_core::CoreError;
use feedseal_validate::Diagnostic;
use thiserror::Error;

/// Errors from building or signing a document.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The assembled feed or item failed validation.
    #[error("validation failed with {} error(s){}", .0.len(), first_message(.0))]
    Validation(Vec<Diagnostic>),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The signing key does not belong to the author being signed for.
    #[error("signing key {found} does not match author key {expected}")]
    KeyMismatch { expected: String, found: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}

fn first_message(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .first()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

impl BuildError {
    /// Diagnostics carried by a validation failure.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            BuildError::Validation(d) => d,
            _ => &[],
        }
    }
}

/// Result type for builder operations.
pub type Result<T> = std::result::Result<T, BuildError>;
