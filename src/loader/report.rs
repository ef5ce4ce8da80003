//! Replay report
//!
//! Units record their status under their candidate id, possibly from
//! several worker threads at once. The finished report lists entries in
//! candidate enumeration order regardless of completion order.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Concurrent collector for unit statuses
#[derive(Debug)]
pub struct ReportBuilder {
    order: Vec<String>,
    statuses: Mutex<HashMap<String, String>>,
}

impl ReportBuilder {
    /// `order` is the candidate enumeration order
    pub fn new(order: Vec<String>) -> Self {
        Self {
            order,
            statuses: Mutex::new(HashMap::new()),
        }
    }

    /// Record the status for `id`, replacing any earlier one
    pub fn record(&self, id: &str, status: impl Into<String>) {
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), status.into());
    }

    /// Record `processed <passed> of <total>`
    pub fn record_processed(&self, id: &str, passed: u64, total: u64) {
        self.record(id, format!("processed {} of {}", passed, total));
    }

    pub fn finish(&self) -> ReplayReport {
        let mut statuses = self
            .statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut entries = Vec::with_capacity(statuses.len());
        for id in &self.order {
            if let Some(status) = statuses.remove(id) {
                entries.push((id.clone(), status));
            }
        }
        // Ids recorded outside the enumeration go last, sorted for stability.
        let mut strays: Vec<_> = statuses.drain().collect();
        strays.sort();
        entries.extend(strays);

        ReplayReport { entries }
    }
}

/// Finished report, in candidate order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    entries: Vec<(String, String)>,
}

impl ReplayReport {
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, status)| status.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One `<id> <status>` line per entry
    pub fn message(&self) -> String {
        self.entries
            .iter()
            .map(|(id, status)| format!("{} {}", id, status))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_enumeration_order_wins() {
        let builder = ReportBuilder::new(ids(&["a", "b", "c"]));
        builder.record("c", "boom");
        builder.record_processed("a", 5, 5);

        let report = builder.finish();
        assert_eq!(report.message(), "a processed 5 of 5\nc boom");
        assert_eq!(report.get("b"), None);
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn test_concurrent_records_not_lost() {
        let order: Vec<String> = (0..64).map(|i| format!("svc{:02}", i)).collect();
        let builder = Arc::new(ReportBuilder::new(order.clone()));

        let handles: Vec<_> = order
            .iter()
            .cloned()
            .map(|id| {
                let builder = Arc::clone(&builder);
                thread::spawn(move || builder.record_processed(&id, 1, 1))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let report = builder.finish();
        assert_eq!(report.len(), 64);
        let listed: Vec<_> = report.entries().iter().map(|(id, _)| id.clone()).collect();
        assert_eq!(listed, order);
    }

    #[test]
    fn test_empty_report() {
        let report = ReportBuilder::new(Vec::new()).finish();
        assert!(report.is_empty());
        assert_eq!(report.message(), "");
    }
}
