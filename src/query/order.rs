//! Client-side ordering
//!
//! Orders records by one or more fields, deterministically. Sorting is
//! stable, so records that compare equal keep their stream order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::Record;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderKey {
    pub field: String,
    pub direction: Direction,
}

/// Sort specification; earlier keys take precedence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub keys: Vec<OrderKey>,
}

impl Order {
    /// Ascending on a single field
    pub fn asc(field: impl Into<String>) -> Self {
        Self::default().then_asc(field)
    }

    /// Descending on a single field
    pub fn desc(field: impl Into<String>) -> Self {
        Self::default().then_desc(field)
    }

    /// Add an ascending tie-breaker
    pub fn then_asc(mut self, field: impl Into<String>) -> Self {
        self.keys.push(OrderKey {
            field: field.into(),
            direction: Direction::Asc,
        });
        self
    }

    /// Add a descending tie-breaker
    pub fn then_desc(mut self, field: impl Into<String>) -> Self {
        self.keys.push(OrderKey {
            field: field.into(),
            direction: Direction::Desc,
        });
        self
    }

    /// Compare two records under this order
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        for key in &self.keys {
            let ordering = compare_values(a.get(&key.field), b.get(&key.field));
            let ordering = match key.direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Stable in-place sort
    pub fn sort(&self, records: &mut [Record]) {
        if self.keys.is_empty() {
            return;
        }
        records.sort_by(|a, b| self.compare(a, b));
    }
}

/// Compares two JSON values.
///
/// Ordering rules:
/// - unset < null < bool < number < string < array < object
/// - same types use natural ordering; arrays and objects compare equal
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a_val), Some(b_val)) => {
            let a_type = type_order(a_val);
            let b_type = type_order(b_val);
            if a_type != b_type {
                return a_type.cmp(&b_type);
            }

            match (a_val, b_val) {
                (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
                (Value::Number(x), Value::Number(y)) => {
                    if let (Some(xi), Some(yi)) = (x.as_i64(), y.as_i64()) {
                        return xi.cmp(&yi);
                    }
                    let xf = x.as_f64().unwrap_or(0.0);
                    let yf = y.as_f64().unwrap_or(0.0);
                    xf.partial_cmp(&yf).unwrap_or(Ordering::Equal)
                }
                (Value::String(x), Value::String(y)) => x.cmp(y),
                _ => Ordering::Equal,
            }
        }
    }
}

fn type_order(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
