//! Document store adapter
//!
//! Implements the DAO contract over a document store collection.
//!
//! An adapter starts as `UninitializedAdapter`; `initialize` creates the
//! unique identity index and yields the ready `DocumentStoreAdapter`. Only
//! the ready form has data operations.
//!
//! The store handle is fetched from the `ConnectionService` on every
//! operation. Filtering, ordering and paging of selects happen here, over
//! a full collection cursor.

use std::sync::Arc;

use super::command::{CommandOutcome, DaoCommand};
use super::contract::Dao;
use super::errors::{DaoError, DaoResult};
use super::filter::IdentityFilterBuilder;
use super::query::SelectQuery;
use super::sink::{decorate, Sink, Subscription};
use crate::observability::{log_event_with_fields, Event, Logger, OperationScope};
use crate::record::{CodecError, CodecPool, IdentityKey, Record};
use crate::schema::SchemaDescriptor;
use crate::store::{ConnectionService, DocumentStore, Filter, IndexSpec, StoreError};

/// Adapter that has not created its identity index yet
pub struct UninitializedAdapter {
    connection: Arc<ConnectionService>,
    schema: Arc<SchemaDescriptor>,
    collection: String,
}

impl UninitializedAdapter {
    /// Create the unique identity index and become ready
    pub fn initialize(self) -> DaoResult<DocumentStoreAdapter> {
        let adapter = DocumentStoreAdapter {
            filters: IdentityFilterBuilder::new(&self.schema),
            codecs: CodecPool::new(Arc::clone(&self.schema)),
            connection: self.connection,
            schema: self.schema,
            collection: self.collection,
        };

        let spec = IndexSpec::new(adapter.filters.identity().to_vec(), true);
        adapter.create_index(&spec)?;

        log_event_with_fields(
            Event::AdapterReady,
            &[
                ("collection", &adapter.collection),
                ("identity", &spec.name()),
                ("record_type", adapter.schema.name()),
            ],
        );
        Ok(adapter)
    }
}

/// Ready adapter for one record type and collection
pub struct DocumentStoreAdapter {
    connection: Arc<ConnectionService>,
    schema: Arc<SchemaDescriptor>,
    collection: String,
    filters: IdentityFilterBuilder,
    codecs: CodecPool,
}

impl DocumentStoreAdapter {
    /// Start building an adapter; call `initialize` on the result
    pub fn create(
        connection: Arc<ConnectionService>,
        schema: Arc<SchemaDescriptor>,
        collection: impl Into<String>,
    ) -> UninitializedAdapter {
        UninitializedAdapter {
            connection,
            schema,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn schema(&self) -> &Arc<SchemaDescriptor> {
        &self.schema
    }

    /// Identity fields, cached at initialization
    pub fn identity_fields(&self) -> &[String] {
        self.filters.identity()
    }

    /// The identity filter for a record or identity value
    pub fn filter_for(&self, key: &IdentityKey) -> DaoResult<Filter> {
        self.filters.build(key)
    }

    /// Replace the stored document with the same identity, or insert.
    /// Returns the input unchanged.
    pub fn upsert(&self, record: Record) -> DaoResult<Record> {
        let mut scope = OperationScope::new(&self.collection, "upsert");
        let result = self.try_upsert(&record);
        if result.is_err() {
            scope.fail();
        }
        result.map(|_| record)
    }

    fn try_upsert(&self, record: &Record) -> DaoResult<()> {
        let filter = self.filters.build(&IdentityKey::from(record))?;
        let document = self.codecs.acquire().encode(record);
        let store = self.store("upsert")?;

        match store.replace_one(&self.collection, &filter, document, true) {
            Ok(_) => Ok(()),
            Err(e) if e.is_duplicate_key() => {
                self.diagnose_duplicate(store.as_ref(), &filter, &e);
                Err(DaoError::ConstraintViolation {
                    collection: self.collection.clone(),
                    message: e.to_string(),
                })
            }
            Err(e) => Err(self.failed(Event::UpsertFailed, "upsert", &filter, e)),
        }
    }

    /// Count what already matches the identity. Best effort: a failing
    /// count is logged and ignored.
    fn diagnose_duplicate(&self, store: &dyn DocumentStore, filter: &Filter, cause: &StoreError) {
        let filter_text = filter.to_string();
        let cause_text = cause.to_string();
        match store.count_documents(&self.collection, filter) {
            Ok(count) => {
                let count = count.to_string();
                log_event_with_fields(
                    Event::DuplicateIdentity,
                    &[
                        ("collection", &self.collection),
                        ("error", &cause_text),
                        ("filter", &filter_text),
                        ("matching", &count),
                    ],
                );
            }
            Err(e) => {
                let message = e.to_string();
                log_event_with_fields(
                    Event::DuplicateCountFailed,
                    &[
                        ("collection", &self.collection),
                        ("error", &message),
                        ("filter", &filter_text),
                    ],
                );
            }
        }
    }

    /// Fetch the first document matching the identity
    pub fn find_by_id(&self, id: impl Into<IdentityKey>) -> DaoResult<Option<Record>> {
        let mut scope = OperationScope::new(&self.collection, "find");
        let result = self.try_find(&id.into());
        if result.is_err() {
            scope.fail();
        }
        result
    }

    fn try_find(&self, key: &IdentityKey) -> DaoResult<Option<Record>> {
        let filter = self.filters.build(key)?;
        let store = self.store("find")?;

        let document = store
            .find_first(&self.collection, &filter)
            .map_err(|e| self.failed(Event::FindFailed, "find", &filter, e))?;

        match document {
            Some(document) => self
                .codecs
                .acquire()
                .decode(&document)
                .map(Some)
                .map_err(|e| self.undecodable(Event::FindFailed, e)),
            None => Ok(None),
        }
    }

    /// Delete at most one document with the record's identity
    pub fn remove(&self, record: Record) -> DaoResult<Record> {
        let mut scope = OperationScope::new(&self.collection, "remove");
        let result = self.try_remove(&record);
        if result.is_err() {
            scope.fail();
        }
        result.map(|_| record)
    }

    fn try_remove(&self, record: &Record) -> DaoResult<()> {
        let filter = self.filters.build(&IdentityKey::from(record))?;
        let store = self.store("remove")?;
        store
            .delete_one(&self.collection, &filter)
            .map(|_| ())
            .map_err(|e| self.failed(Event::RemoveFailed, "remove", &filter, e))
    }

    /// Stream the collection through `query` into `sink`.
    ///
    /// Stops pulling from the cursor once the sink detaches. `eof` is
    /// delivered once on completion or cancellation, not on error.
    pub fn streaming_select(&self, query: &SelectQuery, sink: &mut dyn Sink) -> DaoResult<()> {
        let mut scope = OperationScope::new(&self.collection, "select");
        let result = self.try_select(query, sink);
        if result.is_err() {
            scope.fail();
        }
        result
    }

    fn try_select(&self, query: &SelectQuery, sink: &mut dyn Sink) -> DaoResult<()> {
        let store = self.store("select")?;
        let mut cursor = store
            .open_cursor(&self.collection)
            .map_err(|e| self.failed(Event::SelectFailed, "select", &Filter::new(), e))?;

        let subscription = Subscription::new();
        let mut chain = decorate(query, sink);
        let codec = self.codecs.acquire();

        if query.limit == Some(0) {
            subscription.detach();
        }

        while !subscription.is_detached() {
            let document = match cursor.next() {
                Some(Ok(document)) => document,
                Some(Err(e)) => {
                    return Err(self.failed(Event::SelectFailed, "select", &Filter::new(), e))
                }
                None => break,
            };

            let record = codec
                .decode(&document)
                .map_err(|e| self.undecodable(Event::SelectFailed, e))?;
            if let Some(predicate) = &query.predicate {
                if !predicate.matches(&record) {
                    continue;
                }
            }
            chain.put(record, &subscription);
        }

        drop(cursor);
        chain.eof();
        Ok(())
    }

    /// Handle `add-index`; decline everything else
    pub fn manage_index(&self, command: &DaoCommand) -> DaoResult<CommandOutcome> {
        let (fields, unique) = match command {
            DaoCommand::AddIndex { fields, unique } => (fields, *unique),
            other => {
                Logger::trace(
                    Event::CommandDeclined.as_str(),
                    &[("collection", &self.collection), ("kind", other.kind())],
                );
                return Ok(CommandOutcome::Unhandled);
            }
        };

        if fields.is_empty() {
            return Ok(CommandOutcome::Handled);
        }
        for field in fields {
            if self.schema.field(field).is_none() {
                return Err(DaoError::UnknownField {
                    record_type: self.schema.name().to_string(),
                    field: field.clone(),
                });
            }
        }

        let _scope = OperationScope::new(&self.collection, "add-index");
        self.create_index(&IndexSpec::new(fields.clone(), unique))?;
        Ok(CommandOutcome::Handled)
    }

    fn create_index(&self, spec: &IndexSpec) -> DaoResult<()> {
        let store = self.store("create-index")?;
        match store.create_index(&self.collection, spec) {
            Ok(name) => {
                let unique = spec.unique.to_string();
                log_event_with_fields(
                    Event::IndexCreated,
                    &[
                        ("collection", &self.collection),
                        ("index", &name),
                        ("unique", &unique),
                    ],
                );
                Ok(())
            }
            Err(e) if e.is_duplicate_key() => Err(DaoError::ConstraintViolation {
                collection: self.collection.clone(),
                message: e.to_string(),
            }),
            Err(e) => Err(DaoError::Connectivity {
                collection: self.collection.clone(),
                operation: "create-index",
                message: e.to_string(),
            }),
        }
    }

    fn store(&self, operation: &'static str) -> DaoResult<Arc<dyn DocumentStore>> {
        self.connection
            .handle(&self.collection)
            .map_err(|e| DaoError::Connectivity {
                collection: self.collection.clone(),
                operation,
                message: e.to_string(),
            })
    }

    fn undecodable(&self, event: Event, error: CodecError) -> DaoError {
        let error = DaoError::from(error);
        if let DaoError::Decode {
            message, payload, ..
        } = &error
        {
            log_event_with_fields(
                event,
                &[
                    ("collection", &self.collection),
                    ("error", message),
                    ("payload", payload),
                ],
            );
        }
        error
    }

    fn failed(
        &self,
        event: Event,
        operation: &'static str,
        filter: &Filter,
        error: StoreError,
    ) -> DaoError {
        let message = error.to_string();
        let filter_text = filter.to_string();
        log_event_with_fields(
            event,
            &[
                ("collection", &self.collection),
                ("error", &message),
                ("filter", &filter_text),
            ],
        );
        DaoError::Connectivity {
            collection: self.collection.clone(),
            operation,
            message,
        }
    }
}

impl Dao for DocumentStoreAdapter {
    fn of(&self) -> &Arc<SchemaDescriptor> {
        &self.schema
    }

    fn put(&self, record: Record) -> DaoResult<Record> {
        self.upsert(record)
    }

    fn find(&self, id: &IdentityKey) -> DaoResult<Option<Record>> {
        self.find_by_id(id.clone())
    }

    fn remove(&self, record: Record) -> DaoResult<Record> {
        DocumentStoreAdapter::remove(self, record)
    }

    fn select(&self, query: &SelectQuery, sink: &mut dyn Sink) -> DaoResult<()> {
        self.streaming_select(query, sink)
    }

    fn cmd(&self, command: &DaoCommand) -> DaoResult<CommandOutcome> {
        self.manage_index(command)
    }
}
