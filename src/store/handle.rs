//! The document store contract
//!
//! A handle is shared by every adapter and thread that uses the store.
//! Implementations provide atomic replace-or-insert per document; callers
//! add no locking of their own.

use super::document::{Document, Filter, IndexSpec, ReplaceOutcome};
use super::errors::StoreResult;

/// Forward-only stream of documents in storage order
pub type Cursor = Box<dyn Iterator<Item = StoreResult<Document>> + Send>;

/// Operations the adapter needs from a document store
pub trait DocumentStore: Send + Sync {
    /// Round-trip no-op used as a liveness probe
    fn ping(&self) -> StoreResult<()>;

    /// Replace the first document matching `filter`; insert when none
    /// matches and `upsert` is set.
    fn replace_one(
        &self,
        collection: &str,
        filter: &Filter,
        document: Document,
        upsert: bool,
    ) -> StoreResult<ReplaceOutcome>;

    /// First document matching `filter`
    fn find_first(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>>;

    /// Number of documents matching `filter`
    fn count_documents(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;

    /// Delete at most one matching document; returns the number deleted
    fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;

    /// Cursor over the whole collection. Dropping it releases it.
    fn open_cursor(&self, collection: &str) -> StoreResult<Cursor>;

    /// Create an ascending index; returns its name. Creating an index that
    /// already exists is a no-op.
    fn create_index(&self, collection: &str, spec: &IndexSpec) -> StoreResult<String>;

    /// Release the handle. Later calls fail with `StoreError::Closed`.
    fn close(&self);
}
