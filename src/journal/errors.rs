//! Journal error types

use std::path::Path;

use thiserror::Error;

/// Result type for journal operations
pub type JournalResult<T> = Result<T, JournalError>;

/// Journal errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JournalError {
    /// The journal file could not be opened or read
    #[error("cannot open journal {path}: {message}")]
    Open { path: String, message: String },

    /// Appending or syncing an entry failed
    #[error("cannot append to journal {path}: {message}")]
    Append { path: String, message: String },

    /// Framing, checksum or sequence check failed. Replay stops here.
    #[error("journal {path} corrupt at offset {offset}: {reason}")]
    Corruption {
        path: String,
        offset: u64,
        reason: String,
    },
}

impl JournalError {
    pub(crate) fn open(path: &Path, message: impl ToString) -> Self {
        JournalError::Open {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn append(path: &Path, message: impl ToString) -> Self {
        JournalError::Append {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn corruption(path: &Path, offset: u64, reason: impl Into<String>) -> Self {
        JournalError::Corruption {
            path: path.display().to_string(),
            offset,
            reason: reason.into(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            JournalError::Open { .. } => "JOURNAL_OPEN",
            JournalError::Append { .. } => "JOURNAL_APPEND",
            JournalError::Corruption { .. } => "JOURNAL_CORRUPTION",
        }
    }

    pub fn is_corruption(&self) -> bool {
        matches!(self, JournalError::Corruption { .. })
    }
}
