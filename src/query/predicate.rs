//! Record predicates
//!
//! Evaluated client-side against decoded records. No type coercion:
//! `"30"` never equals `30`, and range comparisons only hold between two
//! numbers or two strings. Unset fields match nothing except `Not`.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::order::compare_values;
use crate::record::Record;

/// A boolean condition over a record
#[derive(Clone)]
pub enum Predicate {
    Eq(String, Value),
    Neq(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    /// Field equals one of the values
    In(String, Vec<Value>),
    /// Field is set
    Has(String),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    /// Arbitrary caller-supplied condition
    Custom(Arc<dyn Fn(&Record) -> bool + Send + Sync>),
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Eq(field.into(), value.into())
    }

    pub fn neq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Neq(field.into(), value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Gt(field.into(), value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Gte(field.into(), value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Lt(field.into(), value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Lte(field.into(), value.into())
    }

    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Predicate::In(field.into(), values)
    }

    pub fn has(field: impl Into<String>) -> Self {
        Predicate::Has(field.into())
    }

    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::And(mut all) => {
                all.push(other);
                Predicate::And(all)
            }
            first => Predicate::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Predicate) -> Self {
        match self {
            Predicate::Or(mut any) => {
                any.push(other);
                Predicate::Or(any)
            }
            first => Predicate::Or(vec![first, other]),
        }
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Wrap a closure
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        Predicate::Custom(Arc::new(f))
    }

    /// Evaluate against a record
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::Eq(field, expected) => record.get(field) == Some(expected),
            Predicate::Neq(field, expected) => {
                matches!(record.get(field), Some(actual) if actual != expected)
            }
            Predicate::Gt(field, bound) => range(record.get(field), bound, |o| o == Ordering::Greater),
            Predicate::Gte(field, bound) => range(record.get(field), bound, |o| o != Ordering::Less),
            Predicate::Lt(field, bound) => range(record.get(field), bound, |o| o == Ordering::Less),
            Predicate::Lte(field, bound) => range(record.get(field), bound, |o| o != Ordering::Greater),
            Predicate::In(field, values) => record
                .get(field)
                .map(|actual| values.contains(actual))
                .unwrap_or(false),
            Predicate::Has(field) => record.get(field).is_some(),
            Predicate::And(all) => all.iter().all(|p| p.matches(record)),
            Predicate::Or(any) => any.iter().any(|p| p.matches(record)),
            Predicate::Not(inner) => !inner.matches(record),
            Predicate::Custom(f) => f(record),
        }
    }
}

fn range(actual: Option<&Value>, bound: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    match (actual, bound) {
        (Some(a @ Value::Number(_)), Value::Number(_)) | (Some(a @ Value::String(_)), Value::String(_)) => {
            accept(compare_values(Some(a), Some(bound)))
        }
        _ => false,
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Eq(field, v) => write!(f, "{} == {}", field, v),
            Predicate::Neq(field, v) => write!(f, "{} != {}", field, v),
            Predicate::Gt(field, v) => write!(f, "{} > {}", field, v),
            Predicate::Gte(field, v) => write!(f, "{} >= {}", field, v),
            Predicate::Lt(field, v) => write!(f, "{} < {}", field, v),
            Predicate::Lte(field, v) => write!(f, "{} <= {}", field, v),
            Predicate::In(field, values) => write!(f, "{} in {:?}", field, values),
            Predicate::Has(field) => write!(f, "has({})", field),
            Predicate::And(all) => f.debug_tuple("And").field(all).finish(),
            Predicate::Or(any) => f.debug_tuple("Or").field(any).finish(),
            Predicate::Not(inner) => f.debug_tuple("Not").field(inner).finish(),
            Predicate::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldType, SchemaDescriptor};
    use serde_json::json;

    fn record(age: Option<i64>) -> Record {
        let schema = SchemaDescriptor::builder("Person")
            .identity("id", FieldType::String)
            .field("age", FieldType::Int)
            .field("name", FieldType::String)
            .build()
            .unwrap();
        let mut record = Record::new(schema).with("id", "1").unwrap().with("name", "Alice").unwrap();
        if let Some(age) = age {
            record.set("age", age).unwrap();
        }
        record
    }

    #[test]
    fn test_equality_without_coercion() {
        let r = record(Some(30));
        assert!(Predicate::eq("age", 30).matches(&r));
        assert!(!Predicate::eq("age", "30").matches(&r));
        assert!(Predicate::neq("name", "Bob").matches(&r));
    }

    #[test]
    fn test_ranges() {
        let r = record(Some(25));
        assert!(Predicate::gte("age", 25).matches(&r));
        assert!(Predicate::gt("age", 18).matches(&r));
        assert!(!Predicate::lt("age", 25).matches(&r));
        assert!(Predicate::lte("age", 25.5).matches(&r));
        assert!(!Predicate::gt("age", "10").matches(&r));
        assert!(Predicate::lt("name", "Bob").matches(&r));
    }

    #[test]
    fn test_unset_field_matches_nothing() {
        let r = record(None);
        assert!(!Predicate::eq("age", json!(null)).matches(&r));
        assert!(!Predicate::neq("age", 1).matches(&r));
        assert!(!Predicate::has("age").matches(&r));
        assert!(Predicate::has("age").negate().matches(&r));
    }

    #[test]
    fn test_combinators() {
        let r = record(Some(40));
        let p = Predicate::gt("age", 30).and(Predicate::eq("name", "Alice"));
        assert!(p.matches(&r));

        let q = Predicate::eq("name", "Bob").or(Predicate::is_in("age", vec![json!(39), json!(40)]));
        assert!(q.matches(&r));

        let c = Predicate::custom(|r| r.get("name").and_then(Value::as_str).map(|n| n.starts_with('A')).unwrap_or(false));
        assert!(c.matches(&r));
        assert_eq!(format!("{:?}", c), "Custom(..)");
    }
}
