//! Document storage errors

use thiserror::Error;

/// Errors from document upload and retrieval
#[derive(Error, Debug)]
pub enum DocumentError {
    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Upload larger than the configured limit
    #[error("Document too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },

    /// Content type not on the allow list
    #[error("Unsupported content type: {0}")]
    UnsupportedType(String),

    /// Upload had no bytes
    #[error("Document is empty")]
    Empty,

    /// Storage key is malformed or escapes the storage root
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Nothing stored under the key
    #[error("Document not found: {0}")]
    NotFound(String),
}

pub type DocumentResult<T> = Result<T, DocumentError>;
