//! Documents, filters and index specifications

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Schemaless document; keys are schema field names verbatim
pub type Document = Map<String, Value>;

/// Conjunction of equality clauses, kept in insertion order.
///
/// Serializes as a plain object: `{"key": "k", "name": "n"}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter {
    clauses: Document,
}

impl Filter {
    /// Empty filter; matches every document
    pub fn new() -> Self {
        Self::default()
    }

    /// Single equality clause
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        let mut filter = Self::new();
        filter.push(field, value);
        filter
    }

    /// Append an equality clause
    pub fn push(&mut self, field: impl Into<String>, value: Value) {
        self.clauses.insert(field.into(), value);
    }

    /// Clauses in insertion order
    pub fn clauses(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.clauses.iter()
    }

    /// Clause fields in insertion order
    pub fn fields(&self) -> Vec<&str> {
        self.clauses.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// The filter as a document
    pub fn as_document(&self) -> &Document {
        &self.clauses
    }

    /// True when every clause equals the document's value for that field.
    /// A missing field only matches a `null` clause.
    pub fn matches(&self, document: &Document) -> bool {
        self.clauses
            .iter()
            .all(|(field, expected)| document.get(field).unwrap_or(&Value::Null) == expected)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.clauses.clone()))
    }
}

/// Ascending index over one or more fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub keys: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

impl IndexSpec {
    pub fn new(keys: Vec<String>, unique: bool) -> Self {
        Self { keys, unique }
    }

    /// Conventional index name: `field_1` per key, joined with `_`
    pub fn name(&self) -> String {
        self.keys
            .iter()
            .map(|k| format!("{}_1", k))
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Key values of a document under this index; missing fields are `null`
    pub fn key_of(&self, document: &Document) -> Vec<Value> {
        self.keys
            .iter()
            .map(|k| document.get(k).cloned().unwrap_or(Value::Null))
            .collect()
    }
}

/// Result of a replace-or-insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaceOutcome {
    /// Documents matched by the filter (0 or 1)
    pub matched: u64,
    /// True when no match existed and a document was inserted
    pub upserted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_single_clause_is_flat() {
        let filter = Filter::eq("id", json!("1"));
        assert_eq!(serde_json::to_string(&filter).unwrap(), r#"{"id":"1"}"#);
    }

    #[test]
    fn test_clause_order_preserved() {
        let mut filter = Filter::new();
        filter.push("name", json!("n"));
        filter.push("key", json!("k"));
        assert_eq!(filter.fields(), vec!["name", "key"]);
        assert_eq!(filter.to_string(), r#"{"name":"n","key":"k"}"#);
    }

    #[test]
    fn test_matches() {
        let mut filter = Filter::new();
        filter.push("key", json!("k"));
        filter.push("name", json!("n"));

        assert!(filter.matches(&doc(json!({"key": "k", "name": "n", "x": 1}))));
        assert!(!filter.matches(&doc(json!({"key": "k", "name": "m"}))));
        assert!(!filter.matches(&doc(json!({"key": "k"}))));
        assert!(Filter::new().matches(&doc(json!({}))));
    }

    #[test]
    fn test_index_name_and_key() {
        let spec = IndexSpec::new(vec!["key".into(), "name".into()], true);
        assert_eq!(spec.name(), "key_1_name_1");
        assert_eq!(
            spec.key_of(&doc(json!({"key": "k"}))),
            vec![json!("k"), Value::Null]
        );
    }
}
