//! The DAO contract

use std::sync::Arc;

use super::command::{CommandOutcome, DaoCommand};
use super::errors::DaoResult;
use super::query::SelectQuery;
use super::sink::{ArraySink, Sink};
use crate::record::{IdentityKey, Record};
use crate::schema::SchemaDescriptor;

/// Generic put/find/remove/select over records of one type
pub trait Dao: Send + Sync {
    /// Record type served
    fn of(&self) -> &Arc<SchemaDescriptor>;

    /// Insert or replace by identity; returns the stored record
    fn put(&self, record: Record) -> DaoResult<Record>;

    /// Look up by identity; `None` when absent
    fn find(&self, id: &IdentityKey) -> DaoResult<Option<Record>>;

    /// Delete by identity; absent records are not an error
    fn remove(&self, record: Record) -> DaoResult<Record>;

    /// Stream matching records into `sink`
    fn select(&self, query: &SelectQuery, sink: &mut dyn Sink) -> DaoResult<()>;

    /// Management command
    fn cmd(&self, command: &DaoCommand) -> DaoResult<CommandOutcome>;

    /// Every record, collected
    fn select_all(&self) -> DaoResult<Vec<Record>> {
        let mut sink = ArraySink::new();
        self.select(&SelectQuery::all(), &mut sink)?;
        Ok(sink.into_records())
    }

    /// Remove every record matching `query`; returns how many
    fn remove_all(&self, query: &SelectQuery) -> DaoResult<usize> {
        let mut sink = ArraySink::new();
        self.select(query, &mut sink)?;
        let records = sink.into_records();
        let count = records.len();
        for record in records {
            self.remove(record)?;
        }
        Ok(count)
    }
}
