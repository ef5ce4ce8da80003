//! Codec pool
//!
//! Hands out codecs with acquire/reset/release discipline: a codec is reset
//! when acquired and returned to the pool when its guard drops. A codec is
//! owned by exactly one guard at a time.

use std::mem;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};

use super::codec::RecordCodec;
use crate::schema::SchemaDescriptor;

/// Default number of idle codecs retained
pub const DEFAULT_MAX_IDLE: usize = 8;

/// Pool of codecs for one record type
#[derive(Debug)]
pub struct CodecPool {
    schema: Arc<SchemaDescriptor>,
    idle: Mutex<Vec<RecordCodec>>,
    max_idle: usize,
}

impl CodecPool {
    /// Create an empty pool
    pub fn new(schema: Arc<SchemaDescriptor>) -> Self {
        Self::with_max_idle(schema, DEFAULT_MAX_IDLE)
    }

    /// Create a pool that keeps at most `max_idle` released codecs
    pub fn with_max_idle(schema: Arc<SchemaDescriptor>, max_idle: usize) -> Self {
        Self {
            schema,
            idle: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Schema of the pooled codecs
    pub fn schema(&self) -> &Arc<SchemaDescriptor> {
        &self.schema
    }

    /// Take a codec, creating one if none is idle
    pub fn acquire(&self) -> PooledCodec<'_> {
        let pooled = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();

        let mut codec = pooled.unwrap_or_else(|| RecordCodec::new(Arc::clone(&self.schema)));
        codec.reset();

        PooledCodec { pool: self, codec }
    }

    /// Number of idle codecs
    pub fn idle_count(&self) -> usize {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn release(&self, codec: RecordCodec) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_idle {
            idle.push(codec);
        }
    }
}

/// A codec on loan from a `CodecPool`
#[derive(Debug)]
pub struct PooledCodec<'a> {
    pool: &'a CodecPool,
    codec: RecordCodec,
}

impl Deref for PooledCodec<'_> {
    type Target = RecordCodec;

    fn deref(&self) -> &RecordCodec {
        &self.codec
    }
}

impl DerefMut for PooledCodec<'_> {
    fn deref_mut(&mut self) -> &mut RecordCodec {
        &mut self.codec
    }
}

impl Drop for PooledCodec<'_> {
    fn drop(&mut self) {
        // An unused codec holds no buffer allocation.
        let empty = RecordCodec::new(Arc::clone(&self.pool.schema));
        self.pool.release(mem::replace(&mut self.codec, empty));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use crate::schema::FieldType;
    use std::thread;

    fn schema() -> Arc<SchemaDescriptor> {
        SchemaDescriptor::builder("Person")
            .identity("id", FieldType::String)
            .field("age", FieldType::Int)
            .build()
            .unwrap()
    }

    #[test]
    fn test_release_on_drop() {
        let pool = CodecPool::new(schema());
        assert_eq!(pool.idle_count(), 0);

        {
            let a = pool.acquire();
            let b = pool.acquire();
            assert_eq!(a.schema().name(), "Person");
            drop(b);
        }

        assert_eq!(pool.idle_count(), 2);
        let _again = pool.acquire();
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn test_acquired_codec_is_reset() {
        let pool = CodecPool::new(schema());
        let record = Record::new(schema()).with("id", "x").unwrap();
        {
            let mut codec = pool.acquire();
            codec.to_bytes(&record).unwrap();
        }

        // Garbage left in the buffer would break parsing of a fresh payload.
        let mut codec = pool.acquire();
        let decoded = codec.from_bytes(br#"{"id":"y"}"#).unwrap();
        assert_eq!(decoded.get("id"), Some(&serde_json::json!("y")));
    }

    #[test]
    fn test_max_idle_bound() {
        let pool = CodecPool::with_max_idle(schema(), 1);
        let a = pool.acquire();
        let b = pool.acquire();
        drop(a);
        drop(b);
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn test_concurrent_use_is_isolated() {
        let pool = Arc::new(CodecPool::new(schema()));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for n in 0..50 {
                        let id = format!("{}-{}", i, n);
                        let record = Record::new(Arc::clone(pool.schema()))
                            .with("id", id.as_str())
                            .unwrap()
                            .with("age", n)
                            .unwrap();
                        let mut codec = pool.acquire();
                        let bytes = codec.to_bytes(&record).unwrap().to_vec();
                        assert_eq!(codec.from_bytes(&bytes).unwrap(), record);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(pool.idle_count() <= DEFAULT_MAX_IDLE);
    }
}
