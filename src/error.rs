//! Crate-wide error type.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while framing, typing, or resolving CQL wire data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("buffer underrun: needed at least {needed} bytes, had {available}")]
    ShortBuffer { needed: usize, available: usize },

    #[error("malformed frame data: {0}")]
    Malformed(String),

    #[error("arity mismatch: expected {expected} values, got {got}")]
    ArityMismatch { expected: usize, got: usize },

    #[error("failed to encode column `{column}`: {reason}")]
    EncodeError { column: String, reason: String },

    #[error("row {row} failed validation for column `{column}`: {reason}")]
    RowValidationError {
        row: usize,
        column: String,
        reason: String,
    },

    #[error("no such row: {0}")]
    NoSuchRow(usize),

    #[error("no such column: {0}")]
    NoSuchColumn(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("server returned error {code:#06x}: {message}")]
    Remote { code: i32, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::Malformed(reason.into())
    }
}
