//! Document store access
//!
//! - `DocumentStore`: the operations the adapter needs from a store
//! - `MemoryServer` / `MemoryConnection`: an in-process store honoring
//!   that contract, including unique indexes
//! - `ConnectionService`: lifecycle of the shared store handle
//!
//! Documents are JSON objects whose keys are schema field names.

mod connection;
mod document;
mod errors;
mod handle;
mod memory;

pub use connection::{
    redact_url, ConnectionConfig, ConnectionService, Connector, MemoryConnector, MEMORY_SCHEME,
};
pub use document::{Document, Filter, IndexSpec, ReplaceOutcome};
pub use errors::{StoreError, StoreResult};
pub use handle::{Cursor, DocumentStore};
pub use memory::{MemoryConnection, MemoryServer};
