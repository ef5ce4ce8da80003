//! Journaled DAO
//!
//! A `Dao` decorator backed by a journal file. Opening it replays every
//! recorded entry, in order, through the delegate: `Put` entries through
//! `put`, `Remove` entries through `remove`. Afterwards writes go to the
//! delegate and, unless the options forbid it, are appended to the journal.
//!
//! Replay accounting:
//! - an entry the delegate accepts counts as a pass
//! - an entry whose body cannot be decoded, or that the delegate rejects,
//!   counts as a fail and replay continues
//! - a framing, checksum or sequence failure stops the replay and fails
//!   `open`

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::entry::{EntryKind, JournalEntry};
use super::errors::JournalResult;
use super::reader::JournalReader;
use super::writer::JournalWriter;
use crate::dao::{CommandOutcome, Dao, DaoCommand, DaoError, DaoResult, SelectQuery, Sink};
use crate::observability::{log_event_with_fields, Event, Timer};
use crate::record::{CodecPool, IdentityKey, Record, RecordCodec};
use crate::schema::SchemaDescriptor;

/// Whether a journaled DAO writes back to its journal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JournalOptions {
    /// Never append to the journal
    pub read_only: bool,
    /// Writes live only in the delegate for this process run
    pub runtime_only: bool,
}

impl JournalOptions {
    /// Replay the journal and never write to it
    pub fn replay_only() -> Self {
        Self {
            read_only: true,
            runtime_only: true,
        }
    }

    /// True when writes are appended to the journal
    pub fn persists(&self) -> bool {
        !self.read_only && !self.runtime_only
    }
}

/// Replay outcome counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub passed: u64,
    pub failed: u64,
}

impl ReplayStats {
    pub fn total(&self) -> u64 {
        self.passed + self.failed
    }
}

/// `Dao` decorator that replays and records a journal
pub struct JournaledDao {
    path: PathBuf,
    delegate: Arc<dyn Dao>,
    options: JournalOptions,
    codecs: CodecPool,
    writer: Option<Mutex<JournalWriter>>,
    stats: ReplayStats,
}

impl JournaledDao {
    /// Replay `path` into `delegate`, then wrap it
    pub fn open(
        path: impl AsRef<Path>,
        delegate: Arc<dyn Dao>,
        options: JournalOptions,
    ) -> JournalResult<Self> {
        let path = path.as_ref().to_path_buf();
        let codecs = CodecPool::new(Arc::clone(delegate.of()));

        let stats = replay(&path, delegate.as_ref(), &codecs)?;

        let writer = if options.persists() {
            Some(Mutex::new(JournalWriter::open(&path)?))
        } else {
            None
        };

        Ok(Self {
            path,
            delegate,
            options,
            codecs,
            writer,
            stats,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> JournalOptions {
        self.options
    }

    /// Entries replayed successfully on open
    pub fn pass_count(&self) -> u64 {
        self.stats.passed
    }

    /// Entries that failed to replay on open
    pub fn fail_count(&self) -> u64 {
        self.stats.failed
    }

    pub fn stats(&self) -> ReplayStats {
        self.stats
    }

    fn record(&self, kind: EntryKind, record: &Record) -> DaoResult<()> {
        let writer = match &self.writer {
            Some(writer) => writer,
            None => return Ok(()),
        };

        let mut codec = self.codecs.acquire();
        let body = codec.to_bytes(record)?;
        writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .append(kind, body)
            .map(|_| ())
            .map_err(|e| DaoError::Journal(e.to_string()))
    }
}

fn replay(path: &Path, delegate: &dyn Dao, codecs: &CodecPool) -> JournalResult<ReplayStats> {
    let timer = Timer::new();
    let path_text = path.display().to_string();
    let record_type = delegate.of().name().to_string();
    log_event_with_fields(
        Event::JournalReplayBegin,
        &[("path", &path_text), ("record_type", &record_type)],
    );

    let mut reader = JournalReader::open(path)?;
    let mut stats = ReplayStats::default();
    let mut codec = codecs.acquire();

    loop {
        let entry = match reader.read_next() {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                let message = e.to_string();
                log_event_with_fields(
                    Event::JournalCorruption,
                    &[("error", &message), ("path", &path_text)],
                );
                return Err(e);
            }
        };

        match apply(&entry, delegate, &mut codec) {
            Ok(()) => stats.passed += 1,
            Err(e) => {
                stats.failed += 1;
                let sequence = entry.sequence.to_string();
                let message = e.to_string();
                log_event_with_fields(
                    Event::JournalEntryFailed,
                    &[
                        ("error", &message),
                        ("kind", entry.kind.as_str()),
                        ("path", &path_text),
                        ("sequence", &sequence),
                    ],
                );
            }
        }
    }

    let passed = stats.passed.to_string();
    let failed = stats.failed.to_string();
    let duration_ms = timer.elapsed_ms();
    log_event_with_fields(
        Event::JournalReplayComplete,
        &[
            ("duration_ms", &duration_ms),
            ("failed", &failed),
            ("passed", &passed),
            ("path", &path_text),
        ],
    );
    Ok(stats)
}

fn apply(
    entry: &JournalEntry,
    delegate: &dyn Dao,
    codec: &mut RecordCodec,
) -> DaoResult<()> {
    let record = codec.from_bytes(&entry.body)?;
    match entry.kind {
        EntryKind::Put => delegate.put(record).map(|_| ()),
        EntryKind::Remove => delegate.remove(record).map(|_| ()),
    }
}

impl Dao for JournaledDao {
    fn of(&self) -> &Arc<SchemaDescriptor> {
        self.delegate.of()
    }

    fn put(&self, record: Record) -> DaoResult<Record> {
        let stored = self.delegate.put(record)?;
        self.record(EntryKind::Put, &stored)?;
        Ok(stored)
    }

    fn find(&self, id: &IdentityKey) -> DaoResult<Option<Record>> {
        self.delegate.find(id)
    }

    fn remove(&self, record: Record) -> DaoResult<Record> {
        let removed = self.delegate.remove(record)?;
        self.record(EntryKind::Remove, &removed)?;
        Ok(removed)
    }

    fn select(&self, query: &SelectQuery, sink: &mut dyn Sink) -> DaoResult<()> {
        self.delegate.select(query, sink)
    }

    fn cmd(&self, command: &DaoCommand) -> DaoResult<CommandOutcome> {
        self.delegate.cmd(command)
    }
}

impl std::fmt::Debug for JournaledDao {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournaledDao")
            .field("path", &self.path)
            .field("options", &self.options)
            .field("stats", &self.stats)
            .finish()
    }
}
