//! Select parameters

use crate::query::{Order, Predicate};

/// What a select returns: records admitted by `predicate`, sorted by
/// `order`, after skipping `skip` and stopping at `limit`.
#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    pub predicate: Option<Predicate>,
    pub skip: u64,
    pub limit: Option<u64>,
    pub order: Option<Order>,
}

impl SelectQuery {
    /// Every record, storage order
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }
}
