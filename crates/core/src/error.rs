//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("malformed manifest line {line}: {reason}")]
    Manifest { line: usize, reason: String },

    #[error("unrecognized record type '{0}' (expected 'asset' or 'deletion')")]
    UnrecognizedRecordType(String),

    #[error("unrecognized match mode '{0}' (expected 'hash' or 'filename')")]
    UnrecognizedMatchMode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
