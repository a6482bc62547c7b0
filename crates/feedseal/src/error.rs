//! Error types for the protocol facade.

use feedseal_builder::BuildError;
use feedseal_core::CoreError;
use thiserror::Error;

/// Errors from [`Protocol`](crate::Protocol) operations.
///
/// Bad documents are not errors: validation and parsing report them as
/// diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    /// Key or signature handling failed.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Document construction failed.
    #[error("build error: {0}")]
    Build(#[from] BuildError),
}

/// Result type for facade operations.
pub type Result<T> = std::result::Result<T, Error>;
