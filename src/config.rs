//! Configuration
//!
//! One JSON file configures the store connection and the replay loader.
//! Every field has a default, so `{}` is a valid configuration. Loading
//! always validates.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::loader::LoaderConfig;
use crate::observability::{log_event_with_fields, Event};
use crate::store::ConnectionConfig;

/// Result type for configuration
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {message}")]
    Read { path: String, message: String },

    #[error("invalid config JSON: {0}")]
    Parse(String),

    #[error("invalid value for {field}: {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "CONFIG_READ",
            ConfigError::Parse(_) => "CONFIG_PARSE",
            ConfigError::Invalid { .. } => "CONFIG_INVALID",
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub loader: LoaderConfig,
}

impl DaoConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let config = Self::parse(&content)?;

        let path_text = path.display().to_string();
        log_event_with_fields(Event::ConfigLoaded, &[("path", &path_text)]);
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let config: DaoConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.connection.validate()?;
        self.loader.validate()
    }
}
