//! Client-side query primitives
//!
//! Predicates and ordering applied to decoded records. The document store
//! is never asked to filter, sort or page.

mod order;
mod predicate;

pub use order::{compare_values, Direction, Order, OrderKey};
pub use predicate::Predicate;
