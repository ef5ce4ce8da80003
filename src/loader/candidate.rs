//! Service candidates
//!
//! A candidate is a registered service id plus the descriptor script it
//! was wired from. Registries list candidates in registration order.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{LoaderError, LoaderResult};

/// A registered service that may own a journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCandidate {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_script: Option<String>,
}

impl ServiceCandidate {
    pub fn new(id: impl Into<String>, service_script: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            service_script: Some(service_script.into()),
        }
    }

    /// A candidate registered without a descriptor
    pub fn bare(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            service_script: None,
        }
    }

    /// Descriptor text, `None` when missing or blank
    pub fn script(&self) -> Option<&str> {
        self.service_script
            .as_deref()
            .filter(|script| !script.trim().is_empty())
    }
}

/// Read-only listing of service candidates
pub trait CandidateRegistry: Send + Sync {
    /// Every candidate, in registry order
    fn list(&self) -> LoaderResult<Vec<ServiceCandidate>>;
}

impl CandidateRegistry for Vec<ServiceCandidate> {
    fn list(&self) -> LoaderResult<Vec<ServiceCandidate>> {
        Ok(self.clone())
    }
}

/// Candidates stored one JSON object per line.
///
/// Blank lines and lines starting with `//` are ignored.
#[derive(Debug, Clone)]
pub struct FileCandidateRegistry {
    path: PathBuf,
}

impl FileCandidateRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CandidateRegistry for FileCandidateRegistry {
    fn list(&self) -> LoaderResult<Vec<ServiceCandidate>> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            LoaderError::Registry(format!("cannot read {}: {}", self.path.display(), e))
        })?;

        let mut candidates = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            let candidate: ServiceCandidate = serde_json::from_str(line).map_err(|e| {
                LoaderError::Registry(format!(
                    "{} line {}: {}",
                    self.path.display(),
                    index + 1,
                    e
                ))
            })?;
            candidates.push(candidate);
        }
        Ok(candidates)
    }
}
