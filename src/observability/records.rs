//! Event records
//!
//! Immutable, timestamped entries appended to an event sink. The loader
//! emits them at the start and end of every run.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::logger::{Logger, Severity};

/// One immutable event record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique record id
    pub id: Uuid,
    /// Creation time
    pub created: DateTime<Utc>,
    /// What the record is about (for example the store kind being loaded)
    pub subject: String,
    /// Short message
    pub message: String,
    /// Severity
    #[serde(with = "severity_serde")]
    pub severity: Severity,
    /// Optional payload (reports, durations)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_message: Option<String>,
}

impl EventRecord {
    /// Create a record stamped now
    pub fn new(
        subject: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        response_message: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created: Utc::now(),
            subject: subject.into(),
            message: message.into(),
            severity,
            response_message,
        }
    }
}

/// Append-only destination for event records
pub trait EventSink: Send + Sync {
    /// Append a record and return it. Ordering is emission order.
    fn emit(
        &self,
        subject: &str,
        message: &str,
        severity: Severity,
        response_message: Option<String>,
    ) -> EventRecord;
}

/// In-memory event log; every emitted record is also logged.
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    records: Mutex<Vec<EventRecord>>,
}

impl MemoryEventLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records in emission order
    pub fn records(&self) -> Vec<EventRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True if nothing has been emitted
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemoryEventLog {
    fn emit(
        &self,
        subject: &str,
        message: &str,
        severity: Severity,
        response_message: Option<String>,
    ) -> EventRecord {
        let record = EventRecord::new(subject, message, severity, response_message);

        let id = record.id.to_string();
        Logger::log(
            severity,
            "EVENT_RECORD",
            &[
                ("id", &id),
                ("message", &record.message),
                ("subject", &record.subject),
            ],
        );

        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        record
    }
}

mod severity_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Severity;

    pub fn serialize<S: Serializer>(severity: &Severity, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(severity.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Severity, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "TRACE" => Ok(Severity::Trace),
            "INFO" => Ok(Severity::Info),
            "WARN" => Ok(Severity::Warn),
            "ERROR" => Ok(Severity::Error),
            "FATAL" => Ok(Severity::Fatal),
            other => Err(serde::de::Error::custom(format!("unknown severity '{}'", other))),
        }
    }
}
