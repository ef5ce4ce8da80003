//! Journal replay loader
//!
//! Replays the journals of wired store services into fresh document store
//! adapters.
//!
//! A run:
//! 1. emits a start event record
//! 2. runs the health check
//! 3. lists candidates and resolves each against the service directory;
//!    ineligible candidates are logged and left out of the report
//! 4. queues one replay unit per eligible candidate
//! 5. drains the queue
//! 6. emits a completion event record carrying the report
//! 7. emits an end event record with the run duration, on every path
//!
//! A failing or panicking unit is recorded in the report under its
//! candidate id and never affects other units. A failure anywhere else aborts the run: it is
//! emitted as an ERROR event record and returned to the caller.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use super::candidate::{CandidateRegistry, FileCandidateRegistry, ServiceCandidate};
use super::config::LoaderConfig;
use super::errors::{LoaderResult, ReplayError};
use super::layers::{find_eligible, LiveService, ServiceDirectory, SkipReason, StoreConfiguration};
use super::queue::TaskQueue;
use super::report::{ReplayReport, ReportBuilder};
use crate::config::ConfigError;
use crate::dao::DocumentStoreAdapter;
use crate::journal::{JournalOptions, JournaledDao, ReplayStats};
use crate::observability::{log_event, log_event_with_fields, Event, EventSink, Severity, Timer};
use crate::store::ConnectionService;

/// Precondition checked before any candidate is loaded
pub trait HealthCheck: Send + Sync {
    fn check(&self) -> LoaderResult<()>;
}

/// Health check that always passes
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHealthCheck;

impl HealthCheck for NoopHealthCheck {
    fn check(&self) -> LoaderResult<()> {
        Ok(())
    }
}

/// Loads store journals into document store adapters
pub struct JournalLoader {
    config: LoaderConfig,
    connection: Arc<ConnectionService>,
    registry: Arc<dyn CandidateRegistry>,
    directory: Arc<ServiceDirectory>,
    events: Arc<dyn EventSink>,
    health: Arc<dyn HealthCheck>,
}

impl JournalLoader {
    pub fn new(
        config: LoaderConfig,
        connection: Arc<ConnectionService>,
        registry: Arc<dyn CandidateRegistry>,
        directory: Arc<ServiceDirectory>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            connection,
            registry,
            directory,
            events,
            health: Arc::new(NoopHealthCheck),
        }
    }

    /// Loader whose candidates come from `config.services_path`
    pub fn from_config(
        config: LoaderConfig,
        connection: Arc<ConnectionService>,
        directory: Arc<ServiceDirectory>,
        events: Arc<dyn EventSink>,
    ) -> LoaderResult<Self> {
        config.validate()?;
        let path = config.services_path.clone().ok_or_else(|| {
            ConfigError::invalid("loader.services_path", "required to list candidates")
        })?;
        let registry = Arc::new(FileCandidateRegistry::new(path));
        Ok(Self::new(config, connection, registry, directory, events))
    }

    /// Replace the health check
    pub fn with_health_check(mut self, health: Arc<dyn HealthCheck>) -> Self {
        self.health = health;
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Run one load. Unit failures are reported, not returned.
    pub fn run(&self) -> LoaderResult<ReplayReport> {
        let subject = self.config.event_subject.as_str();
        let _end = EndRecord {
            events: self.events.as_ref(),
            subject,
            timer: Timer::new(),
        };

        log_event_with_fields(Event::LoadStart, &[("subject", subject)]);
        self.events
            .emit(subject, "loading", Severity::Info, Some("start".to_string()));

        match self.health_then_load() {
            Ok(report) => {
                let message = report.message();
                let entries = report.len().to_string();
                log_event_with_fields(Event::LoadReport, &[("entries", &entries)]);
                self.events
                    .emit(subject, "complete", Severity::Info, Some(message));
                Ok(report)
            }
            Err(e) => {
                let message = e.to_string();
                log_event_with_fields(
                    Event::LoadFailed,
                    &[("code", e.code()), ("error", &message)],
                );
                self.events.emit(subject, &message, Severity::Error, None);
                Err(e)
            }
        }
    }

    fn health_then_load(&self) -> LoaderResult<ReplayReport> {
        log_event(Event::LoadHealth);
        self.health.check()?;
        self.load()
    }

    fn load(&self) -> LoaderResult<ReplayReport> {
        let candidates = self.registry.list()?;
        let report = Arc::new(ReportBuilder::new(
            candidates.iter().map(|c| c.id.clone()).collect(),
        ));

        let queue = TaskQueue::new(self.config.queue)?;
        for candidate in candidates {
            let target = match self.resolve(&candidate) {
                Ok(target) => target,
                Err(reason) => {
                    log_event_with_fields(
                        Event::CandidateSkipped,
                        &[("reason", reason.as_str()), ("service", &candidate.id)],
                    );
                    continue;
                }
            };

            let unit = ReplayUnit {
                journal: self.config.journal_dir.join(&target.journal),
                id: candidate.id,
                target,
                connection: Arc::clone(&self.connection),
                report: Arc::clone(&report),
            };
            queue.enqueue(move || unit.run())?;
        }
        queue.shutdown()?;

        Ok(report.finish())
    }

    /// The configuration to replay for `candidate`, or why it is skipped
    pub fn resolve(&self, candidate: &ServiceCandidate) -> Result<StoreConfiguration, SkipReason> {
        let script = candidate.script().ok_or(SkipReason::NoDescriptor)?;
        if !script.contains(self.config.load_pattern.as_str()) {
            return Err(SkipReason::PatternMismatch);
        }

        match self.directory.get(&candidate.id) {
            None => Err(SkipReason::NotWired),
            Some(LiveService::Other(_)) => Err(SkipReason::NotStore),
            Some(LiveService::Store(outer)) => find_eligible(outer).ok_or(SkipReason::NotFound),
        }
    }
}

/// Emits the end event record when a run leaves scope
struct EndRecord<'a> {
    events: &'a dyn EventSink,
    subject: &'a str,
    timer: Timer,
}

impl Drop for EndRecord<'_> {
    fn drop(&mut self) {
        let duration_ms = self.timer.elapsed_ms();
        log_event_with_fields(
            Event::LoadEnd,
            &[("duration_ms", &duration_ms), ("subject", self.subject)],
        );
        self.events.emit(
            self.subject,
            "end",
            Severity::Info,
            Some(format!("duration {}ms", duration_ms)),
        );
    }
}

/// Replay of one candidate's journal
struct ReplayUnit {
    id: String,
    target: StoreConfiguration,
    journal: PathBuf,
    connection: Arc<ConnectionService>,
    report: Arc<ReportBuilder>,
}

impl ReplayUnit {
    fn run(self) {
        let timer = Timer::new();
        let journal = self.journal.display().to_string();
        log_event_with_fields(
            Event::UnitStart,
            &[("journal", &journal), ("service", &self.id)],
        );

        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| self.replay())) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = format!("replay panicked: {}", panic_message(payload.as_ref()));
                log_event_with_fields(
                    Event::UnitFailed,
                    &[("code", "LOADER_UNIT_PANIC"), ("error", &message), ("service", &self.id)],
                );
                self.report.record(&self.id, message);
                return;
            }
        };

        match outcome {
            Ok(stats) if stats.total() > 0 => {
                self.report
                    .record_processed(&self.id, stats.passed, stats.total());
                let passed = stats.passed.to_string();
                let total = stats.total().to_string();
                let duration_ms = timer.elapsed_ms();
                log_event_with_fields(
                    Event::UnitEnd,
                    &[
                        ("duration_ms", &duration_ms),
                        ("passed", &passed),
                        ("service", &self.id),
                        ("total", &total),
                    ],
                );
            }
            Ok(_) => {
                log_event_with_fields(
                    Event::UnitEmpty,
                    &[
                        ("reason", SkipReason::EmptyJournal.as_str()),
                        ("service", &self.id),
                    ],
                );
            }
            Err(e) => {
                let message = e.to_string();
                log_event_with_fields(
                    Event::UnitFailed,
                    &[("code", e.code()), ("error", &message), ("service", &self.id)],
                );
                self.report.record(&self.id, message);
            }
        }
    }

    fn replay(&self) -> Result<ReplayStats, ReplayError> {
        let adapter = DocumentStoreAdapter::create(
            Arc::clone(&self.connection),
            Arc::clone(&self.target.schema),
            self.target.collection.as_str(),
        )
        .initialize()?;

        let journaled = JournaledDao::open(
            &self.journal,
            Arc::new(adapter),
            JournalOptions::replay_only(),
        )?;
        Ok(journaled.stats())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{EntryKind, JournalWriter};
    use crate::loader::{ConfiguredLayer, LoaderError, ProxyLayer, QueuePolicy, StoreLayer};
    use crate::observability::MemoryEventLog;
    use crate::schema::{FieldType, SchemaDescriptor};
    use crate::store::{ConnectionConfig, MemoryConnector, MemoryServer};
    use std::path::Path;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        server: MemoryServer,
        config: LoaderConfig,
        directory: ServiceDirectory,
        events: Arc<MemoryEventLog>,
    }

    fn person() -> Arc<SchemaDescriptor> {
        SchemaDescriptor::builder("Person")
            .identity("id", FieldType::String)
            .field("age", FieldType::Int)
            .build()
            .unwrap()
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let config = LoaderConfig {
            journal_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        Fixture {
            _dir: dir,
            server: MemoryServer::new(),
            config,
            directory: ServiceDirectory::new(),
            events: Arc::new(MemoryEventLog::new()),
        }
    }

    fn write_people(path: &Path, count: usize) {
        let mut writer = JournalWriter::open(path).unwrap();
        for i in 0..count {
            let body = format!(r#"{{"id":"{}","age":{}}}"#, i, 20 + i);
            writer.append(EntryKind::Put, body.as_bytes()).unwrap();
        }
    }

    impl Fixture {
        fn wire(&mut self, id: &str, collection: &str) {
            let layer: Arc<dyn StoreLayer> = Arc::new(ConfiguredLayer::new(
                id,
                StoreConfiguration::journaled(person(), collection, format!("{}.journal", id)),
            ));
            self.directory
                .register_store(id, Arc::new(ProxyLayer::new("auth", layer)));
        }

        fn loader(&self, candidates: Vec<ServiceCandidate>) -> JournalLoader {
            let connection = Arc::new(ConnectionService::new(
                ConnectionConfig::default(),
                Arc::new(MemoryConnector::new(self.server.clone())),
            ));
            JournalLoader::new(
                self.config.clone(),
                connection,
                Arc::new(candidates),
                Arc::new(self.directory.clone()),
                self.events.clone(),
            )
        }
    }

    #[test]
    fn test_replays_eligible_candidate() {
        let mut fx = fixture();
        fx.wire("people", "people");
        write_people(&fx.config.journal_dir.join("people.journal"), 3);

        let report = fx
            .loader(vec![ServiceCandidate::new("people", "new ConfiguredStore()")])
            .run()
            .unwrap();

        assert_eq!(report.get("people"), Some("processed 3 of 3"));
        assert_eq!(fx.server.documents("docdao", "people").len(), 3);

        let messages: Vec<_> = fx.events.records().into_iter().map(|r| r.message).collect();
        assert_eq!(messages, vec!["loading", "complete", "end"]);
    }

    #[test]
    fn test_resolve_skips() {
        let mut fx = fixture();
        fx.wire("people", "people");
        fx.directory
            .register("clock", LiveService::Other("clock".into()));
        fx.directory
            .register_store("plain", Arc::new(ProxyLayer::terminal("plain")));
        let loader = fx.loader(Vec::new());

        let skip = |c: ServiceCandidate| loader.resolve(&c).unwrap_err();
        assert_eq!(skip(ServiceCandidate::bare("people")), SkipReason::NoDescriptor);
        assert_eq!(
            skip(ServiceCandidate::new("people", "new CachedStore()")),
            SkipReason::PatternMismatch
        );
        assert_eq!(
            skip(ServiceCandidate::new("ghost", "ConfiguredStore")),
            SkipReason::NotWired
        );
        assert_eq!(
            skip(ServiceCandidate::new("clock", "ConfiguredStore")),
            SkipReason::NotStore
        );
        assert_eq!(
            skip(ServiceCandidate::new("plain", "ConfiguredStore")),
            SkipReason::NotFound
        );
        assert!(loader
            .resolve(&ServiceCandidate::new("people", "ConfiguredStore"))
            .is_ok());
    }

    #[test]
    fn test_async_policy_matches_sync_report() {
        let mut fx = fixture();
        let mut candidates = Vec::new();
        for i in 0..6 {
            let id = format!("svc{}", i);
            fx.wire(&id, &id);
            write_people(&fx.config.journal_dir.join(format!("{}.journal", id)), i + 1);
            candidates.push(ServiceCandidate::new(id, "ConfiguredStore"));
        }
        fx.config.queue = QueuePolicy::Async { workers: 3 };

        let report = fx.loader(candidates).run().unwrap();
        let expected: Vec<String> = (0..6)
            .map(|i| format!("svc{} processed {} of {}", i, i + 1, i + 1))
            .collect();
        assert_eq!(report.message(), expected.join("\n"));
    }

    #[test]
    fn test_health_failure_aborts_with_error_record() {
        struct Unhealthy;
        impl HealthCheck for Unhealthy {
            fn check(&self) -> LoaderResult<()> {
                Err(LoaderError::Health("store in maintenance".into()))
            }
        }

        let fx = fixture();
        let err = fx
            .loader(Vec::new())
            .with_health_check(Arc::new(Unhealthy))
            .run()
            .unwrap_err();
        assert_eq!(err.code(), "LOADER_HEALTH");

        let records = fx.events.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].message, "loading");
        assert_eq!(records[1].severity, Severity::Error);
        assert!(records[1].message.contains("store in maintenance"));
        assert_eq!(records[2].message, "end");
    }

    #[test]
    fn test_from_config_requires_services_path() {
        let fx = fixture();
        let connection = Arc::new(ConnectionService::new(
            ConnectionConfig::default(),
            Arc::new(MemoryConnector::new(fx.server.clone())),
        ));
        let result = JournalLoader::from_config(
            fx.config.clone(),
            connection,
            Arc::new(ServiceDirectory::new()),
            fx.events.clone(),
        );
        assert_eq!(result.err().map(|e| e.code()), Some("CONFIG_INVALID"));
    }
}
