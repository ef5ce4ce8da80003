//! Timing helpers
//!
//! `OperationScope` logs `OPERATION_TIMED` at TRACE when dropped, so every
//! exit path of an operation is measured.

use std::time::{Duration, Instant};

use super::events::Event;
use super::logger::{Logger, Severity};

/// A simple duration timer
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed time since creation
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Get elapsed milliseconds as a string
    pub fn elapsed_ms(&self) -> String {
        self.start.elapsed().as_millis().to_string()
    }

    /// Get elapsed microseconds as a string
    pub fn elapsed_us(&self) -> String {
        self.start.elapsed().as_micros().to_string()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

/// Measures one operation against one collection.
pub struct OperationScope<'a> {
    collection: &'a str,
    operation: &'static str,
    timer: Timer,
    failed: bool,
}

impl<'a> OperationScope<'a> {
    /// Start timing `operation` on `collection`
    pub fn new(collection: &'a str, operation: &'static str) -> Self {
        Self {
            collection,
            operation,
            timer: Timer::new(),
            failed: false,
        }
    }

    /// Mark the operation as failed; reported in the timing line
    pub fn fail(&mut self) {
        self.failed = true;
    }

    /// Returns true if `fail` was called
    pub fn is_failed(&self) -> bool {
        self.failed
    }
}

impl Drop for OperationScope<'_> {
    fn drop(&mut self) {
        if !Logger::enabled(Severity::Trace) {
            return;
        }
        let elapsed = self.timer.elapsed_us();
        let outcome = if self.failed { "error" } else { "ok" };
        Logger::trace(
            Event::OperationTimed.as_str(),
            &[
                ("collection", self.collection),
                ("elapsed_us", &elapsed),
                ("operation", self.operation),
                ("outcome", outcome),
            ],
        );
    }
}
