//! Loader configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::queue::QueuePolicy;
use crate::config::{ConfigError, ConfigResult};

/// How a replay run is scheduled and reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Task queue policy (default: sync)
    #[serde(default)]
    pub queue: QueuePolicy,

    /// Text a service script must contain to be considered (default: "ConfiguredStore")
    #[serde(default = "default_load_pattern")]
    pub load_pattern: String,

    /// Subject of emitted event records (default: "DocumentStore")
    #[serde(default = "default_event_subject")]
    pub event_subject: String,

    /// Directory relative journal paths resolve against (default: "journals")
    #[serde(default = "default_journal_dir")]
    pub journal_dir: PathBuf,

    /// JSON-lines services file listing candidates
    #[serde(default)]
    pub services_path: Option<PathBuf>,
}

fn default_load_pattern() -> String {
    "ConfiguredStore".to_string()
}

fn default_event_subject() -> String {
    "DocumentStore".to_string()
}

fn default_journal_dir() -> PathBuf {
    PathBuf::from("journals")
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            queue: QueuePolicy::default(),
            load_pattern: default_load_pattern(),
            event_subject: default_event_subject(),
            journal_dir: default_journal_dir(),
            services_path: None,
        }
    }
}

impl LoaderConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if let QueuePolicy::Async { workers: 0 } = self.queue {
            return Err(ConfigError::invalid(
                "loader.queue.workers",
                "must be greater than 0",
            ));
        }
        if self.load_pattern.trim().is_empty() {
            return Err(ConfigError::invalid("loader.load_pattern", "must not be empty"));
        }
        if self.event_subject.trim().is_empty() {
            return Err(ConfigError::invalid("loader.event_subject", "must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: LoaderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, LoaderConfig::default());
        assert_eq!(config.queue, QueuePolicy::Sync);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_workers_invalid() {
        let config: LoaderConfig =
            serde_json::from_str(r#"{"queue":{"mode":"async","workers":0}}"#).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("loader.queue.workers"));
    }

    #[test]
    fn test_blank_pattern_invalid() {
        let config = LoaderConfig {
            load_pattern: "".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
