//! Loader error types
//!
//! `ReplayError` is confined to one replay unit and becomes a report entry.
//! `LoaderError` aborts the whole run.

use thiserror::Error;

use crate::config::ConfigError;
use crate::dao::DaoError;
use crate::journal::JournalError;

/// Result type for loader runs
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Failure of one replay unit
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplayError {
    /// Provisioning or driving the adapter failed
    #[error(transparent)]
    Adapter(#[from] DaoError),

    /// The journal could not be opened or read
    #[error(transparent)]
    Journal(#[from] JournalError),
}

impl ReplayError {
    pub fn code(&self) -> &'static str {
        match self {
            ReplayError::Adapter(e) => e.code(),
            ReplayError::Journal(e) => e.code(),
        }
    }
}

/// Failure that aborts a loader run
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Candidates could not be listed
    #[error("candidate registry failed: {0}")]
    Registry(String),

    /// The health precondition rejected the run
    #[error("health check failed: {0}")]
    Health(String),

    /// A queued unit could not be scheduled or its worker failed
    #[error("task queue failed: {0}")]
    Queue(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl LoaderError {
    pub fn code(&self) -> &'static str {
        match self {
            LoaderError::Registry(_) => "LOADER_REGISTRY",
            LoaderError::Health(_) => "LOADER_HEALTH",
            LoaderError::Queue(_) => "LOADER_QUEUE",
            LoaderError::Config(e) => e.code(),
        }
    }
}
