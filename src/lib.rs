//! docdao - Typed records over a schemaless document store
//!
//! - `dao`: the DAO contract and the document store adapter
//! - `journal`: append-only write journals and the replaying `JournaledDao`
//! - `loader`: bulk replay of service journals into fresh adapters

pub mod config;
pub mod dao;
pub mod journal;
pub mod loader;
pub mod observability;
pub mod query;
pub mod record;
pub mod schema;
pub mod store;
