//! Catalog error types.

use assetcat_storage::StorageError;
use thiserror::Error;

/// Catalog operation errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("unable to connect to catalog at {target} after {attempts} attempts: {last_error}")]
    ConnectionExhausted {
        target: String,
        attempts: u32,
        last_error: String,
    },

    #[error("FATAL catalog inconsistency: {matches} rows match {key}")]
    Inconsistent { key: String, matches: u64 },

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("unrecognized record source '{0}' (expected 'impact' or 'partnerize')")]
    UnrecognizedSource(String),

    #[error("unknown column '{column}' for table {table}")]
    UnknownColumn { table: &'static str, column: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Record(#[from] assetcat_core::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CatalogError {
    /// Errors that must abort the enclosing process rather than skip a record.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CatalogError::ConnectionExhausted { .. } | CatalogError::Inconsistent { .. }
        )
    }

    /// Errors worth retrying while establishing a connection. Anything else
    /// (an incompatible schema, bad configuration) fails the same way twice.
    pub fn is_transient(&self) -> bool {
        matches!(self, CatalogError::Database(_) | CatalogError::Io(_))
    }
}

/// Result type for catalog operations.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let inconsistent = CatalogError::Inconsistent {
            key: "filename=a.csv".to_string(),
            matches: 2,
        };
        assert!(inconsistent.is_fatal());
        assert!(inconsistent.to_string().contains("FATAL"));

        let exhausted = CatalogError::ConnectionExhausted {
            target: "db:5432".to_string(),
            attempts: 3,
            last_error: "refused".to_string(),
        };
        assert!(exhausted.is_fatal());
        assert!(exhausted.to_string().contains("after 3 attempts"));

        assert!(!CatalogError::InvalidRecord("bad".to_string()).is_fatal());
        assert!(!CatalogError::Conflict("raced".to_string()).is_fatal());

        assert!(CatalogError::Database(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!CatalogError::Config("bad schema".to_string()).is_transient());
    }
}
