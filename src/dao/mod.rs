//! Data access objects over a document store
//!
//! `DocumentStoreAdapter` implements the `Dao` contract for one record
//! type and collection:
//!
//! - `upsert` / `find_by_id` / `remove` address documents through an
//!   identity filter built from the record or its identity value
//! - `streaming_select` scans the whole collection client-side and feeds
//!   a sink chain (order -> skip -> limit -> consumer) with cancellation
//! - `manage_index` handles `add-index` commands and declines the rest

mod adapter;
mod command;
mod contract;
mod errors;
mod filter;
mod query;
mod sink;

pub use adapter::{DocumentStoreAdapter, UninitializedAdapter};
pub use command::{CommandOutcome, DaoCommand};
pub use contract::Dao;
pub use errors::{DaoError, DaoResult};
pub use filter::IdentityFilterBuilder;
pub use query::SelectQuery;
pub use sink::{
    decorate, ArraySink, CountSink, LimitSink, OrderedSink, Sink, SkipSink, Subscription,
};
