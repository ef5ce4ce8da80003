//! Codec error types

use thiserror::Error;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while mapping records to and from documents
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A document could not be mapped onto the schema.
    /// `payload` is the raw JSON text of the offending document.
    #[error("cannot decode {record_type}: {message}")]
    Decode {
        record_type: String,
        message: String,
        payload: String,
    },

    /// A record could not be serialized
    #[error("cannot encode {record_type}: {message}")]
    Encode { record_type: String, message: String },
}

impl CodecError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CodecError::Decode { .. } => "CODEC_DECODE",
            CodecError::Encode { .. } => "CODEC_ENCODE",
        }
    }

    /// Raw payload for decode failures
    pub fn payload(&self) -> Option<&str> {
        match self {
            CodecError::Decode { payload, .. } => Some(payload),
            CodecError::Encode { .. } => None,
        }
    }
}
