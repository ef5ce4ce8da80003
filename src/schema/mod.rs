//! Schema descriptors for record types
//!
//! A `SchemaDescriptor` is the explicit, read-only description of a record
//! type: ordered named fields, which of them form the identity, and which
//! are storable. Descriptors are built once and shared through `Arc`.

mod errors;
mod types;

pub use errors::{SchemaError, SchemaResult};
pub use types::{json_type_name, FieldDescriptor, FieldType, SchemaBuilder, SchemaDescriptor};
