//! Error types for the Bundler.

use databundle_core::{CoreError, VerifyError};
use thiserror::Error;

/// Errors that can occur during Bundler operations.
#[derive(Debug, Error)]
pub enum BundlerError {
    /// Encoding, decoding or signing error.
    #[error("codec error: {0}")]
    Core(#[from] CoreError),

    /// An item failed verification.
    #[error("verification error: {0}")]
    Verify(#[from] VerifyError),

    /// A caller tag uses a name reserved for bundle metadata.
    #[error("reserved tag collision: {0}")]
    ReservedTagCollision(String),

    /// I/O error outside the codec (opening bundle files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking task failed to complete.
    #[error("task failed: {0}")]
    Task(String),
}

/// Result type for Bundler operations.
pub type Result<T> = std::result::Result<T, BundlerError>;
