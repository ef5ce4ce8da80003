//! Journal Loader Tests
//!
//! Test Categories:
//! 1. Report contents and failure isolation
//! 2. Eligibility skips
//! 3. Event record lifecycle on success and failure
//! 4. Panicking units

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use docdao::journal::{EntryKind, JournalWriter};
use docdao::loader::{
    CandidateRegistry, ConfiguredLayer, JournalLoader, LiveService, LoaderConfig, LoaderError,
    LoaderResult, ProxyLayer, QueuePolicy, ServiceCandidate, ServiceDirectory,
    StoreConfiguration, StoreLayer,
};
use docdao::observability::{MemoryEventLog, Severity};
use docdao::schema::{FieldType, SchemaDescriptor};
use docdao::store::{
    ConnectionConfig, ConnectionService, Connector, Cursor, Document, DocumentStore, Filter,
    IndexSpec, MemoryConnector, MemoryServer, ReplaceOutcome, StoreResult,
};

const SCRIPT: &str = r#"new ConfiguredStore({ journal: "single" })"#;

fn person() -> Arc<SchemaDescriptor> {
    SchemaDescriptor::builder("Person")
        .identity("id", FieldType::String)
        .field("age", FieldType::Int)
        .build()
        .unwrap()
}

fn write_people(path: &Path, ids: &[&str]) {
    let mut writer = JournalWriter::open(path).unwrap();
    for (i, id) in ids.iter().enumerate() {
        let body = format!(r#"{{"id":"{}","age":{}}}"#, id, 30 + i);
        writer.append(EntryKind::Put, body.as_bytes()).unwrap();
    }
}

/// Appends bytes that do not frame as a journal entry.
fn corrupt_tail(path: &Path) {
    let mut bytes = fs::read(path).unwrap();
    bytes.extend_from_slice(&[0xAB; 32]);
    fs::write(path, bytes).unwrap();
}

struct Harness {
    dir: TempDir,
    server: MemoryServer,
    directory: ServiceDirectory,
    events: Arc<MemoryEventLog>,
    queue: QueuePolicy,
}

impl Harness {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            server: MemoryServer::new(),
            directory: ServiceDirectory::new(),
            events: Arc::new(MemoryEventLog::new()),
            queue: QueuePolicy::Sync,
        }
    }

    fn journal(&self, id: &str) -> std::path::PathBuf {
        self.dir.path().join(format!("{}.journal", id))
    }

    /// Wire `id` as an eligible store behind a proxy layer
    fn wire(&mut self, id: &str) {
        let configured: Arc<dyn StoreLayer> = Arc::new(ConfiguredLayer::new(
            id,
            StoreConfiguration::journaled(person(), id, format!("{}.journal", id)),
        ));
        self.directory
            .register_store(id, Arc::new(ProxyLayer::new("authenticated", configured)));
    }

    fn loader(&self, registry: Arc<dyn CandidateRegistry>) -> JournalLoader {
        let connector = Arc::new(MemoryConnector::new(self.server.clone()));
        self.loader_with(registry, connector)
    }

    fn loader_with(
        &self,
        registry: Arc<dyn CandidateRegistry>,
        connector: Arc<dyn Connector>,
    ) -> JournalLoader {
        let config = LoaderConfig {
            queue: self.queue,
            journal_dir: self.dir.path().to_path_buf(),
            ..Default::default()
        };
        let connection = Arc::new(ConnectionService::new(ConnectionConfig::default(), connector));
        JournalLoader::new(
            config,
            connection,
            registry,
            Arc::new(self.directory.clone()),
            self.events.clone(),
        )
    }

    fn abc(&mut self) -> Vec<ServiceCandidate> {
        for id in ["A", "B", "C"] {
            self.wire(id);
        }
        write_people(&self.journal("A"), &["a1", "a2", "a3", "a4", "a5"]);
        write_people(&self.journal("B"), &["b1", "b2"]);
        corrupt_tail(&self.journal("B"));

        vec![
            ServiceCandidate::new("A", SCRIPT),
            ServiceCandidate::new("B", SCRIPT),
            ServiceCandidate::new("C", SCRIPT),
        ]
    }

    fn count(&self, message: &str) -> usize {
        self.events
            .records()
            .iter()
            .filter(|r| r.message == message)
            .count()
    }
}

// =============================================================================
// REPORT AND FAILURE ISOLATION
// =============================================================================

/// Test: A replays cleanly, B fails mid-way, C has no journal.
#[test]
fn test_abc_scenario() {
    let mut h = Harness::new();
    let candidates = h.abc();

    let report = h.loader(Arc::new(candidates)).run().unwrap();

    assert_eq!(report.len(), 2);
    assert_eq!(report.get("A"), Some("processed 5 of 5"));
    let b = report.get("B").unwrap();
    assert!(b.contains("corrupt"), "unexpected status: {}", b);
    assert_eq!(report.get("C"), None);

    let message = report.message();
    let ids: Vec<&str> = message
        .lines()
        .map(|line| line.split(' ').next().unwrap_or(""))
        .collect();
    assert_eq!(ids, vec!["A", "B"]);

    // A's replay landed; B's good prefix was applied before the damage.
    assert_eq!(h.server.documents("docdao", "A").len(), 5);
    assert_eq!(h.server.documents("docdao", "B").len(), 2);
    assert!(h.server.documents("docdao", "C").is_empty());
}

/// Test: The async worker pool produces the same report in the same order.
#[test]
fn test_abc_scenario_async() {
    let mut h = Harness::new();
    h.queue = QueuePolicy::Async { workers: 3 };
    let candidates = h.abc();

    let report = h.loader(Arc::new(candidates)).run().unwrap();
    let ids: Vec<&str> = report.entries().iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);
    assert_eq!(report.get("A"), Some("processed 5 of 5"));
}

/// Test: The completion record carries the report lines.
#[test]
fn test_completion_record_carries_report() {
    let mut h = Harness::new();
    let candidates = h.abc();
    let report = h.loader(Arc::new(candidates)).run().unwrap();

    let records = h.events.records();
    let complete = records.iter().find(|r| r.message == "complete").unwrap();
    assert_eq!(complete.response_message.as_deref(), Some(report.message().as_str()));
    assert_eq!(complete.severity, Severity::Info);
}

// =============================================================================
// ELIGIBILITY
// =============================================================================

/// Test: Ineligible candidates leave no report entry and replay nothing.
#[test]
fn test_ineligible_candidates_skipped() {
    let mut h = Harness::new();
    h.wire("people");
    write_people(&h.journal("people"), &["p1"]);

    let mut read_only = StoreConfiguration::journaled(person(), "audit", "audit.journal");
    read_only.read_only = true;
    h.directory
        .register_store("audit", Arc::new(ConfiguredLayer::new("audit", read_only)));
    write_people(&h.journal("audit"), &["x"]);

    h.directory
        .register("mailer", LiveService::Other("mailer".into()));

    let candidates = vec![
        ServiceCandidate::bare("people"),
        ServiceCandidate::new("people", "new CachingStore()"),
        ServiceCandidate::new("audit", SCRIPT),
        ServiceCandidate::new("mailer", SCRIPT),
        ServiceCandidate::new("unknown", SCRIPT),
    ];
    let report = h.loader(Arc::new(candidates)).run().unwrap();

    assert!(report.is_empty());
    assert!(h.server.documents("docdao", "people").is_empty());
    assert!(h.server.documents("docdao", "audit").is_empty());
}

/// Test: Candidates can come from a services file.
#[test]
fn test_services_file_registry() {
    let mut h = Harness::new();
    h.wire("people");
    write_people(&h.journal("people"), &["p1", "p2"]);

    let services = h.dir.path().join("services.jsonl");
    fs::write(
        &services,
        format!(
            "{}\n{}\n",
            serde_json::to_string(&ServiceCandidate::new("people", SCRIPT)).unwrap(),
            r#"{"id":"clock"}"#
        ),
    )
    .unwrap();

    let config = LoaderConfig {
        journal_dir: h.dir.path().to_path_buf(),
        services_path: Some(services),
        ..Default::default()
    };
    let connection = Arc::new(ConnectionService::new(
        ConnectionConfig::default(),
        Arc::new(MemoryConnector::new(h.server.clone())),
    ));
    let loader =
        JournalLoader::from_config(config, connection, Arc::new(h.directory.clone()), h.events.clone())
            .unwrap();

    let report = loader.run().unwrap();
    assert_eq!(report.message(), "people processed 2 of 2");
}

// =============================================================================
// EVENT RECORD LIFECYCLE
// =============================================================================

/// Test: Exactly one start and one end record on success.
#[test]
fn test_start_and_end_once_on_success() {
    let mut h = Harness::new();
    let candidates = h.abc();
    h.loader(Arc::new(candidates)).run().unwrap();

    let messages: Vec<String> = h.events.records().into_iter().map(|r| r.message).collect();
    assert_eq!(messages, vec!["loading", "complete", "end"]);
    assert_eq!(h.count("loading"), 1);
    assert_eq!(h.count("end"), 1);
}

struct BrokenRegistry;

impl CandidateRegistry for BrokenRegistry {
    fn list(&self) -> LoaderResult<Vec<ServiceCandidate>> {
        Err(LoaderError::Registry("services store unreachable".into()))
    }
}

/// Test: A registry failure aborts the run, is recorded at ERROR, and
/// still produces exactly one start and one end record.
#[test]
fn test_start_and_end_once_on_failure() {
    let h = Harness::new();
    let err = h.loader(Arc::new(BrokenRegistry)).run().unwrap_err();
    assert_eq!(err.code(), "LOADER_REGISTRY");

    let records = h.events.records();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].message, "loading");
    assert_eq!(records[0].response_message.as_deref(), Some("start"));
    assert_eq!(records[1].severity, Severity::Error);
    assert!(records[1].message.contains("services store unreachable"));
    assert_eq!(records[2].message, "end");
    assert!(records[2]
        .response_message
        .as_deref()
        .unwrap_or("")
        .starts_with("duration"));
    assert_eq!(h.count("complete"), 0);
}

// =============================================================================
// PANICKING UNITS
// =============================================================================

/// Store whose writes to one collection panic
struct PanickingStore {
    inner: Arc<dyn DocumentStore>,
    collection: &'static str,
}

impl DocumentStore for PanickingStore {
    fn ping(&self) -> StoreResult<()> {
        self.inner.ping()
    }

    fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        document: Document,
        upsert: bool,
    ) -> StoreResult<ReplaceOutcome> {
        if collection == self.collection {
            panic!("store blew up on {}", collection);
        }
        self.inner.replace_one(collection, filter, document, upsert)
    }

    fn find_first(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        self.inner.find_first(collection, filter)
    }

    fn count_documents(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        self.inner.count_documents(collection, filter)
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        self.inner.delete_one(collection, filter)
    }

    fn open_cursor(&self, collection: &str) -> StoreResult<Cursor> {
        self.inner.open_cursor(collection)
    }

    fn create_index(&self, collection: &str, spec: &IndexSpec) -> StoreResult<String> {
        self.inner.create_index(collection, spec)
    }

    fn close(&self) {
        self.inner.close()
    }
}

struct PanickingConnector {
    inner: MemoryConnector,
    collection: &'static str,
}

impl Connector for PanickingConnector {
    fn connect(&self, config: &ConnectionConfig) -> StoreResult<Arc<dyn DocumentStore>> {
        let inner = self.inner.connect(config)?;
        Ok(Arc::new(PanickingStore {
            inner,
            collection: self.collection,
        }))
    }
}

fn panicking_run(queue: QueuePolicy) {
    let mut h = Harness::new();
    h.queue = queue;
    h.wire("A");
    h.wire("B");
    write_people(&h.journal("A"), &["a1", "a2", "a3"]);
    write_people(&h.journal("B"), &["b1", "b2", "b3"]);

    let connector = Arc::new(PanickingConnector {
        inner: MemoryConnector::new(h.server.clone()),
        collection: "B",
    });
    let candidates = vec![
        ServiceCandidate::new("A", SCRIPT),
        ServiceCandidate::new("B", SCRIPT),
    ];
    let report = h.loader_with(Arc::new(candidates), connector).run().unwrap();

    assert_eq!(report.get("A"), Some("processed 3 of 3"));
    let b = report.get("B").unwrap();
    assert!(b.contains("store blew up on B"), "unexpected status: {}", b);
    assert_eq!(h.server.documents("docdao", "A").len(), 3);

    let messages: Vec<String> = h.events.records().into_iter().map(|r| r.message).collect();
    assert_eq!(messages, vec!["loading", "complete", "end"]);
}

/// Test: A unit that panics is reported under its own id and the run
/// still completes with every other unit's entry.
#[test]
fn test_panicking_unit_is_isolated() {
    panicking_run(QueuePolicy::Sync);
}

/// Test: Panic isolation holds on the worker pool too.
#[test]
fn test_panicking_unit_is_isolated_async() {
    panicking_run(QueuePolicy::Async { workers: 2 });
}
