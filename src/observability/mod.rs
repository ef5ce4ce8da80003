//! Observability subsystem
//!
//! - Structured JSON-lines logging (`Logger`)
//! - Explicit lifecycle events (`Event`)
//! - Operation timing (`Timer`, `OperationScope`)
//! - Immutable event records for run history (`EventRecord`, `EventSink`)
//!
//! Observability never fails the operation being observed.
//!
//! ```ignore
//! use docdao::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::AdapterReady, &[("collection", "people")]);
//! ```

mod events;
mod logger;
mod records;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use records::{EventRecord, EventSink, MemoryEventLog};
pub use scope::{OperationScope, Timer};

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields; failure events log at ERROR
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_failure() {
        Severity::Error
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}
