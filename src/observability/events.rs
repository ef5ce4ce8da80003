//! Lifecycle events
//!
//! Every log line emitted by the crate names one of these events.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Connection lifecycle
    /// Connection established and liveness probe succeeded
    ConnectionUp,
    /// Connection could not be established or probe failed
    ConnectionDown,
    /// Previous connection closed after a reload
    ConnectionReloaded,
    /// Active connection closed
    ConnectionStopped,

    // Adapter
    /// Adapter initialized, identity index in place
    AdapterReady,
    /// Index created on a collection
    IndexCreated,
    /// Per-operation timing
    OperationTimed,
    /// Upsert failed
    UpsertFailed,
    /// Duplicate identity detected on upsert
    DuplicateIdentity,
    /// Diagnostic count after a duplicate failed
    DuplicateCountFailed,
    /// Find failed
    FindFailed,
    /// Remove failed
    RemoveFailed,
    /// Streaming select failed
    SelectFailed,
    /// A command was declined
    CommandDeclined,

    // Journal
    /// Journal replay begins
    JournalReplayBegin,
    /// Journal replay complete
    JournalReplayComplete,
    /// A single journal entry could not be applied
    JournalEntryFailed,
    /// Journal corruption detected
    JournalCorruption,

    // Loader
    /// Loader run begins
    LoadStart,
    /// Health precondition running
    LoadHealth,
    /// Loader run report
    LoadReport,
    /// Loader run failed
    LoadFailed,
    /// Loader run ended (always emitted)
    LoadEnd,
    /// Candidate skipped during eligibility resolution
    CandidateSkipped,
    /// Replay unit begins
    UnitStart,
    /// Replay unit finished
    UnitEnd,
    /// Replay unit found nothing to replay
    UnitEmpty,
    /// Replay unit failed
    UnitFailed,

    // Configuration
    /// Configuration loaded
    ConfigLoaded,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConnectionUp => "CONNECTION_UP",
            Event::ConnectionDown => "CONNECTION_DOWN",
            Event::ConnectionReloaded => "CONNECTION_RELOADED",
            Event::ConnectionStopped => "CONNECTION_STOPPED",

            Event::AdapterReady => "ADAPTER_READY",
            Event::IndexCreated => "INDEX_CREATED",
            Event::OperationTimed => "OPERATION_TIMED",
            Event::UpsertFailed => "UPSERT_FAILED",
            Event::DuplicateIdentity => "DUPLICATE_IDENTITY",
            Event::DuplicateCountFailed => "DUPLICATE_COUNT_FAILED",
            Event::FindFailed => "FIND_FAILED",
            Event::RemoveFailed => "REMOVE_FAILED",
            Event::SelectFailed => "SELECT_FAILED",
            Event::CommandDeclined => "COMMAND_DECLINED",

            Event::JournalReplayBegin => "JOURNAL_REPLAY_BEGIN",
            Event::JournalReplayComplete => "JOURNAL_REPLAY_COMPLETE",
            Event::JournalEntryFailed => "JOURNAL_ENTRY_FAILED",
            Event::JournalCorruption => "JOURNAL_CORRUPTION",

            Event::LoadStart => "LOAD_START",
            Event::LoadHealth => "LOAD_HEALTH",
            Event::LoadReport => "LOAD_REPORT",
            Event::LoadFailed => "LOAD_FAILED",
            Event::LoadEnd => "LOAD_END",
            Event::CandidateSkipped => "CANDIDATE_SKIPPED",
            Event::UnitStart => "UNIT_START",
            Event::UnitEnd => "UNIT_END",
            Event::UnitEmpty => "UNIT_EMPTY",
            Event::UnitFailed => "UNIT_FAILED",

            Event::ConfigLoaded => "CONFIG_LOADED",
        }
    }

    /// Returns true if this event indicates a failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::ConnectionDown
                | Event::UpsertFailed
                | Event::DuplicateIdentity
                | Event::DuplicateCountFailed
                | Event::FindFailed
                | Event::RemoveFailed
                | Event::SelectFailed
                | Event::JournalEntryFailed
                | Event::JournalCorruption
                | Event::LoadFailed
                | Event::UnitFailed
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_upper_snake() {
        let events = [
            Event::ConnectionUp,
            Event::ConnectionDown,
            Event::AdapterReady,
            Event::DuplicateIdentity,
            Event::JournalCorruption,
            Event::LoadStart,
            Event::LoadEnd,
            Event::UnitFailed,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_failure_events() {
        assert!(Event::UnitFailed.is_failure());
        assert!(Event::ConnectionDown.is_failure());
        assert!(!Event::LoadStart.is_failure());
        assert!(!Event::AdapterReady.is_failure());
    }
}
