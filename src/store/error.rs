//! Store error types

use thiserror::Error;

use crate::finance::FinanceError;
use crate::store::types::ApplicationStatus;

/// Errors that can occur in the data store
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite returned an error
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O operation failed (creating the data directory)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested record does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Unique constraint or state conflict
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Status change not allowed from the current status
    #[error("Cannot move application from {from} to {to}")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },

    /// Funding arithmetic rejected the operation
    #[error("Funding error: {0}")]
    Funding(#[from] FinanceError),

    /// A stored value could not be decoded
    #[error("Corrupt data: {0}")]
    Corruption(String),

    /// Connection mutex was poisoned
    #[error("Lock error: {0}")]
    Lock(String),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::NotFound("Application 42".to_string());
        assert_eq!(err.to_string(), "Application 42 not found");

        let err = StoreError::InvalidTransition {
            from: ApplicationStatus::Submitted,
            to: ApplicationStatus::Funded,
        };
        assert_eq!(
            err.to_string(),
            "Cannot move application from submitted to funded"
        );
    }

    #[test]
    fn test_finance_error_conversion() {
        let err: StoreError = FinanceError::AlreadyFunded.into();
        assert!(matches!(err, StoreError::Funding(_)));
    }
}
