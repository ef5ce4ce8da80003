//! Record sinks
//!
//! A sink consumes a stream of records. The producer checks the
//! subscription before every record and stops as soon as it is detached;
//! `eof` is called exactly once when the stream ends, whether it ran out
//! or was cancelled.
//!
//! Skip, limit and ordering are sink decorators. `decorate` composes them
//! as order -> skip -> limit -> consumer.

use std::sync::atomic::{AtomicBool, Ordering};

use super::query::SelectQuery;
use crate::query::Order;
use crate::record::Record;

/// Cancellation handle shared by a producer and its sinks
#[derive(Debug, Default)]
pub struct Subscription {
    detached: AtomicBool,
}

impl Subscription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the producer to stop
    pub fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }
}

/// Consumer of a record stream
pub trait Sink {
    /// Receive one record
    fn put(&mut self, record: Record, subscription: &Subscription);

    /// End of stream
    fn eof(&mut self);
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn put(&mut self, record: Record, subscription: &Subscription) {
        (**self).put(record, subscription);
    }

    fn eof(&mut self) {
        (**self).eof();
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn put(&mut self, record: Record, subscription: &Subscription) {
        (**self).put(record, subscription);
    }

    fn eof(&mut self) {
        (**self).eof();
    }
}

/// Collects records in arrival order
#[derive(Debug, Default)]
pub struct ArraySink {
    records: Vec<Record>,
    eof_calls: usize,
}

impl ArraySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Number of `eof` calls received
    pub fn eof_calls(&self) -> usize {
        self.eof_calls
    }
}

impl Sink for ArraySink {
    fn put(&mut self, record: Record, _subscription: &Subscription) {
        self.records.push(record);
    }

    fn eof(&mut self) {
        self.eof_calls += 1;
    }
}

/// Counts records without keeping them
#[derive(Debug, Default)]
pub struct CountSink {
    count: u64,
    eof_calls: usize,
}

impl CountSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn eof_calls(&self) -> usize {
        self.eof_calls
    }
}

impl Sink for CountSink {
    fn put(&mut self, _record: Record, _subscription: &Subscription) {
        self.count += 1;
    }

    fn eof(&mut self) {
        self.eof_calls += 1;
    }
}

/// Drops the first `skip` records
pub struct SkipSink<'a> {
    remaining: u64,
    inner: Box<dyn Sink + 'a>,
}

impl<'a> SkipSink<'a> {
    pub fn new(skip: u64, inner: Box<dyn Sink + 'a>) -> Self {
        Self {
            remaining: skip,
            inner,
        }
    }
}

impl Sink for SkipSink<'_> {
    fn put(&mut self, record: Record, subscription: &Subscription) {
        if self.remaining > 0 {
            self.remaining -= 1;
            return;
        }
        self.inner.put(record, subscription);
    }

    fn eof(&mut self) {
        self.inner.eof();
    }
}

/// Forwards at most `limit` records, then detaches
pub struct LimitSink<'a> {
    remaining: u64,
    inner: Box<dyn Sink + 'a>,
}

impl<'a> LimitSink<'a> {
    pub fn new(limit: u64, inner: Box<dyn Sink + 'a>) -> Self {
        Self {
            remaining: limit,
            inner,
        }
    }
}

impl Sink for LimitSink<'_> {
    fn put(&mut self, record: Record, subscription: &Subscription) {
        if self.remaining == 0 {
            subscription.detach();
            return;
        }
        self.remaining -= 1;
        self.inner.put(record, subscription);
        if self.remaining == 0 {
            subscription.detach();
        }
    }

    fn eof(&mut self) {
        self.inner.eof();
    }
}

/// Buffers the whole stream and replays it sorted on `eof`.
///
/// Downstream detachment during the replay stops the replay but never the
/// upstream producer, which must run to completion before sorting.
pub struct OrderedSink<'a> {
    order: Order,
    buffer: Vec<Record>,
    inner: Box<dyn Sink + 'a>,
}

impl<'a> OrderedSink<'a> {
    pub fn new(order: Order, inner: Box<dyn Sink + 'a>) -> Self {
        Self {
            order,
            buffer: Vec::new(),
            inner,
        }
    }
}

impl Sink for OrderedSink<'_> {
    fn put(&mut self, record: Record, _subscription: &Subscription) {
        self.buffer.push(record);
    }

    fn eof(&mut self) {
        let mut buffer = std::mem::take(&mut self.buffer);
        self.order.sort(&mut buffer);

        let replay = Subscription::new();
        for record in buffer {
            if replay.is_detached() {
                break;
            }
            self.inner.put(record, &replay);
        }
        self.inner.eof();
    }
}

/// Wrap `sink` with the decorators `query` asks for
pub fn decorate<'a>(query: &SelectQuery, sink: &'a mut dyn Sink) -> Box<dyn Sink + 'a> {
    let mut chain: Box<dyn Sink + 'a> = Box::new(sink);

    if let Some(limit) = query.limit {
        chain = Box::new(LimitSink::new(limit, chain));
    }
    if query.skip > 0 {
        chain = Box::new(SkipSink::new(query.skip, chain));
    }
    if let Some(order) = &query.order {
        if !order.keys.is_empty() {
            chain = Box::new(OrderedSink::new(order.clone(), chain));
        }
    }

    chain
}
