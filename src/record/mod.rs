//! Records and the record codec
//!
//! - `Record`: a typed value bound to its `SchemaDescriptor`
//! - `IdentityKey`: a bare identity value or an identity-bearing record
//! - `RecordCodec`: record <-> document mapping
//! - `CodecPool`: pooled codecs for concurrent callers

mod codec;
mod errors;
mod pool;
mod typed;

pub use codec::RecordCodec;
pub use errors::{CodecError, CodecResult};
pub use pool::{CodecPool, PooledCodec, DEFAULT_MAX_IDLE};
pub use typed::{IdentityKey, Record};
