//! Error types for the databundle core.

use thiserror::Error;

use crate::types::ItemId;

/// Errors raised while building, encoding or decoding items and bundles.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unsupported signature type: {0}")]
    UnsupportedScheme(u16),

    #[error("truncated input: {field} needs {needed} more bytes")]
    TruncatedInput { field: &'static str, needed: u64 },

    #[error("malformed field: {0}")]
    MalformedField(String),

    #[error("id mismatch: declared {expected}, recomputed {actual}")]
    IdMismatch { expected: ItemId, actual: ItemId },

    #[error("signer scheme {signer} does not match item scheme {item}")]
    SchemeMismatch { signer: u16, item: u16 },

    #[error("item must be signed before it can be encoded")]
    NotSigned,

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while verifying a decoded item.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("id mismatch: stored {expected}, recomputed {actual}")]
    IdMismatch { expected: ItemId, actual: ItemId },

    #[error("signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("unsupported signature type: {0}")]
    UnsupportedScheme(u16),

    #[error("malformed field: {0}")]
    MalformedField(String),

    #[error("item is not signed")]
    NotSigned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CoreError> for VerifyError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::UnsupportedScheme(s) => VerifyError::UnsupportedScheme(s),
            CoreError::IdMismatch { expected, actual } => {
                VerifyError::IdMismatch { expected, actual }
            }
            CoreError::NotSigned => VerifyError::NotSigned,
            CoreError::Io(e) => VerifyError::Io(e),
            CoreError::TruncatedInput { field, needed } => VerifyError::MalformedField(format!(
                "{field} truncated by {needed} bytes"
            )),
            CoreError::MalformedField(msg) | CoreError::Signing(msg) => {
                VerifyError::MalformedField(msg)
            }
            CoreError::SchemeMismatch { signer, item } => VerifyError::MalformedField(format!(
                "signer scheme {signer} does not match item scheme {item}"
            )),
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
