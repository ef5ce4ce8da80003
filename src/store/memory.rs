//! In-memory document store
//!
//! `MemoryServer` holds the data of every database and collection and can
//! be taken offline to simulate an unreachable store. `MemoryConnection`
//! is one client handle onto a server database; closing it does not
//! affect other connections.
//!
//! Documents are kept in insertion order. Every inserted document receives
//! a generated `_id`, which survives replacement. Unique indexes are
//! enforced on every write.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::Value;
use uuid::Uuid;

use super::document::{Document, Filter, IndexSpec, ReplaceOutcome};
use super::errors::{StoreError, StoreResult};
use super::handle::{Cursor, DocumentStore};

const ID_KEY: &str = "_id";

#[derive(Debug, Default)]
struct MemoryCollection {
    documents: BTreeMap<u64, Document>,
    next_seq: u64,
    indexes: Vec<IndexSpec>,
}

impl MemoryCollection {
    fn first_match(&self, filter: &Filter) -> Option<u64> {
        self.documents
            .iter()
            .find(|(_, doc)| filter.matches(doc))
            .map(|(seq, _)| *seq)
    }

    /// Check `document` against every unique index, ignoring the slot
    /// it is about to replace.
    fn check_unique(
        &self,
        collection: &str,
        document: &Document,
        replacing: Option<u64>,
    ) -> StoreResult<()> {
        for index in self.indexes.iter().filter(|i| i.unique) {
            let key = index.key_of(document);
            let clash = self
                .documents
                .iter()
                .filter(|(seq, _)| Some(**seq) != replacing)
                .any(|(_, other)| index.key_of(other) == key);
            if clash {
                return Err(StoreError::DuplicateKey {
                    collection: collection.to_string(),
                    index: index.name(),
                    key: Value::Array(key).to_string(),
                });
            }
        }
        Ok(())
    }

    fn insert(&mut self, mut document: Document) {
        if !document.contains_key(ID_KEY) {
            document.insert(ID_KEY.to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        self.next_seq += 1;
        self.documents.insert(self.next_seq, document);
    }
}

#[derive(Debug, Default)]
struct ServerState {
    collections: RwLock<HashMap<String, MemoryCollection>>,
    offline: AtomicBool,
    open_connections: AtomicUsize,
}

/// Shared in-memory server. Cloning yields another reference to the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryServer {
    state: Arc<ServerState>,
}

impl MemoryServer {
    /// Create an empty, online server
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a client connection onto `database`
    pub fn connect(&self, database: &str) -> StoreResult<MemoryConnection> {
        self.check_online()?;
        self.state.open_connections.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryConnection {
            server: self.clone(),
            database: database.to_string(),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Take the server offline (or back online). Offline servers fail
    /// every request with `StoreError::Unavailable`.
    pub fn set_online(&self, online: bool) {
        self.state.offline.store(!online, Ordering::SeqCst);
    }

    /// True unless taken offline
    pub fn is_online(&self) -> bool {
        !self.state.offline.load(Ordering::SeqCst)
    }

    /// Connections opened and not yet closed
    pub fn open_connections(&self) -> usize {
        self.state.open_connections.load(Ordering::SeqCst)
    }

    /// Snapshot of a collection in storage order
    pub fn documents(&self, database: &str, collection: &str) -> Vec<Document> {
        let key = namespace(database, collection);
        self.state
            .collections
            .read()
            .map(|c| {
                c.get(&key)
                    .map(|coll| coll.documents.values().cloned().collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    /// Indexes defined on a collection
    pub fn indexes(&self, database: &str, collection: &str) -> Vec<IndexSpec> {
        let key = namespace(database, collection);
        self.state
            .collections
            .read()
            .map(|c| c.get(&key).map(|coll| coll.indexes.clone()).unwrap_or_default())
            .unwrap_or_default()
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.is_online() {
            Ok(())
        } else {
            Err(StoreError::Unavailable("server offline".into()))
        }
    }
}

fn namespace(database: &str, collection: &str) -> String {
    format!("{}.{}", database, collection)
}

fn poisoned<E>(_: E) -> StoreError {
    StoreError::Unavailable("collection lock poisoned".into())
}

/// One client handle onto a `MemoryServer` database
#[derive(Debug)]
pub struct MemoryConnection {
    server: MemoryServer,
    database: String,
    closed: Arc<AtomicBool>,
}

impl MemoryConnection {
    /// Database this connection targets
    pub fn database(&self) -> &str {
        &self.database
    }

    /// True once `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check(&self) -> StoreResult<()> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        self.server.check_online()
    }

    fn read<T>(
        &self,
        collection: &str,
        f: impl FnOnce(Option<&MemoryCollection>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        self.check()?;
        let collections = self.server.state.collections.read().map_err(poisoned)?;
        f(collections.get(&namespace(&self.database, collection)))
    }

    fn write<T>(
        &self,
        collection: &str,
        f: impl FnOnce(&mut MemoryCollection) -> StoreResult<T>,
    ) -> StoreResult<T> {
        self.check()?;
        let mut collections = self.server.state.collections.write().map_err(poisoned)?;
        let entry = collections
            .entry(namespace(&self.database, collection))
            .or_default();
        f(entry)
    }
}

impl DocumentStore for MemoryConnection {
    fn ping(&self) -> StoreResult<()> {
        self.check()
    }

    fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        mut document: Document,
        upsert: bool,
    ) -> StoreResult<ReplaceOutcome> {
        self.write(collection, |coll| match coll.first_match(filter) {
            Some(seq) => {
                coll.check_unique(collection, &document, Some(seq))?;
                if let Some(id) = coll.documents.get(&seq).and_then(|d| d.get(ID_KEY)) {
                    document.insert(ID_KEY.to_string(), id.clone());
                }
                coll.documents.insert(seq, document);
                Ok(ReplaceOutcome {
                    matched: 1,
                    upserted: false,
                })
            }
            None if upsert => {
                coll.check_unique(collection, &document, None)?;
                coll.insert(document);
                Ok(ReplaceOutcome {
                    matched: 0,
                    upserted: true,
                })
            }
            None => Ok(ReplaceOutcome::default()),
        })
    }

    fn find_first(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        self.read(collection, |coll| {
            Ok(coll.and_then(|c| {
                c.documents
                    .values()
                    .find(|doc| filter.matches(doc))
                    .cloned()
            }))
        })
    }

    fn count_documents(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        self.read(collection, |coll| {
            Ok(coll
                .map(|c| c.documents.values().filter(|d| filter.matches(d)).count() as u64)
                .unwrap_or(0))
        })
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        self.write(collection, |coll| match coll.first_match(filter) {
            Some(seq) => {
                coll.documents.remove(&seq);
                Ok(1)
            }
            None => Ok(0),
        })
    }

    fn open_cursor(&self, collection: &str) -> StoreResult<Cursor> {
        self.check()?;
        Ok(Box::new(MemoryCursor {
            server: self.server.clone(),
            namespace: namespace(&self.database, collection),
            closed: Arc::clone(&self.closed),
            position: 0,
            done: false,
        }))
    }

    fn create_index(&self, collection: &str, spec: &IndexSpec) -> StoreResult<String> {
        if spec.keys.is_empty() {
            return Err(StoreError::InvalidRequest("index has no keys".into()));
        }
        self.write(collection, |coll| {
            let name = spec.name();
            if coll.indexes.iter().any(|i| i.name() == name) {
                return Ok(name);
            }

            if spec.unique {
                let mut seen: Vec<Vec<Value>> = Vec::with_capacity(coll.documents.len());
                for doc in coll.documents.values() {
                    let key = spec.key_of(doc);
                    if seen.contains(&key) {
                        return Err(StoreError::DuplicateKey {
                            collection: collection.to_string(),
                            index: name,
                            key: Value::Array(key).to_string(),
                        });
                    }
                    seen.push(key);
                }
            }

            coll.indexes.push(spec.clone());
            Ok(name)
        })
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.server.state.open_connections.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Forward cursor that reads one document per step under a short read
/// lock. Documents inserted behind the cursor position are not revisited.
struct MemoryCursor {
    server: MemoryServer,
    namespace: String,
    closed: Arc<AtomicBool>,
    position: u64,
    done: bool,
}

impl Iterator for MemoryCursor {
    type Item = StoreResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if self.closed.load(Ordering::SeqCst) {
            self.done = true;
            return Some(Err(StoreError::Closed));
        }
        if let Err(e) = self.server.check_online() {
            self.done = true;
            return Some(Err(e));
        }

        let collections = match self.server.state.collections.read() {
            Ok(c) => c,
            Err(e) => {
                self.done = true;
                return Some(Err(poisoned(e)));
            }
        };

        let next = collections.get(&self.namespace).and_then(|coll| {
            coll.documents
                .range((Bound::Excluded(self.position), Bound::Unbounded))
                .next()
                .map(|(seq, doc)| (*seq, doc.clone()))
        });

        match next {
            Some((seq, doc)) => {
                self.position = seq;
                Some(Ok(doc))
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}
