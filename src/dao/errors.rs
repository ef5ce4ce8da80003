//! DAO error types
//!
//! Errors raised by one DAO operation are logged by the adapter and then
//! returned to the immediate caller. None are swallowed.

use thiserror::Error;

use crate::record::CodecError;
use crate::schema::SchemaError;

/// Result type for DAO operations
pub type DaoResult<T> = Result<T, DaoError>;

/// DAO errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DaoError {
    /// The store could not complete the operation
    #[error("{operation} on {collection} failed: {message}")]
    Connectivity {
        collection: String,
        operation: &'static str,
        message: String,
    },

    /// A unique index rejected the write
    #[error("constraint violation on {collection}: {message}")]
    ConstraintViolation { collection: String, message: String },

    /// A stored document could not be mapped onto the record type
    #[error("cannot decode {record_type}: {message}")]
    Decode {
        record_type: String,
        message: String,
        payload: String,
    },

    /// A record could not be serialized
    #[error("cannot encode {record_type}: {message}")]
    Encode { record_type: String, message: String },

    /// The identity value cannot address a record of this type
    #[error("invalid identity for {record_type}: {message}")]
    InvalidIdentity { record_type: String, message: String },

    /// A command names a field the record type does not declare
    #[error("{record_type} has no field '{field}'")]
    UnknownField { record_type: String, field: String },

    /// Writing through to the journal failed
    #[error("journal write failed: {0}")]
    Journal(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl DaoError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            DaoError::Connectivity { .. } => "DAO_CONNECTIVITY",
            DaoError::ConstraintViolation { .. } => "DAO_CONSTRAINT_VIOLATION",
            DaoError::Decode { .. } => "DAO_DECODE",
            DaoError::Encode { .. } => "DAO_ENCODE",
            DaoError::InvalidIdentity { .. } => "DAO_INVALID_IDENTITY",
            DaoError::UnknownField { .. } => "DAO_UNKNOWN_FIELD",
            DaoError::Journal(_) => "DAO_JOURNAL",
            DaoError::Schema(e) => e.code(),
        }
    }
}

impl From<CodecError> for DaoError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Decode {
                record_type,
                message,
                payload,
            } => DaoError::Decode {
                record_type,
                message,
                payload,
            },
            CodecError::Encode {
                record_type,
                message,
            } => DaoError::Encode {
                record_type,
                message,
            },
        }
    }
}
