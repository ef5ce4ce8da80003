//! Document store error types

use thiserror::Error;

/// Result type for document store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by a document store or the connection service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A unique index rejected the write
    #[error("duplicate key in {collection} on index {index}: {key}")]
    DuplicateKey {
        collection: String,
        index: String,
        key: String,
    },

    /// The handle has been closed
    #[error("connection closed")]
    Closed,

    /// The store cannot be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// No live connection is held by the connection service
    #[error("not connected: {0}")]
    NotConnected(String),

    /// The connection URL is not understood by the connector
    #[error("invalid connection url '{0}'")]
    InvalidUrl(String),

    /// The request is malformed
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl StoreError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::DuplicateKey { .. } => "STORE_DUPLICATE_KEY",
            StoreError::Closed => "STORE_CLOSED",
            StoreError::Unavailable(_) => "STORE_UNAVAILABLE",
            StoreError::NotConnected(_) => "STORE_NOT_CONNECTED",
            StoreError::InvalidUrl(_) => "STORE_INVALID_URL",
            StoreError::InvalidRequest(_) => "STORE_INVALID_REQUEST",
        }
    }

    /// True for unique-index violations
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StoreError::DuplicateKey { .. })
    }
}
