//! Typed records bound to a schema descriptor

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::schema::{json_type_name, FieldDescriptor, SchemaDescriptor, SchemaError, SchemaResult};

/// A value of some record type.
///
/// Holds one slot per declared field, in declaration order. `null` means the
/// field is unset; unset fields are never written to the store.
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<SchemaDescriptor>,
    values: Vec<Value>,
}

impl Record {
    /// Create a record with every field unset
    pub fn new(schema: Arc<SchemaDescriptor>) -> Self {
        let values = vec![Value::Null; schema.fields().len()];
        Self { schema, values }
    }

    /// The record's own schema
    pub fn schema(&self) -> &Arc<SchemaDescriptor> {
        &self.schema
    }

    /// Set a field, checking the value against the declared type
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> SchemaResult<()> {
        let value = value.into();
        let position = self
            .schema
            .position(field)
            .ok_or_else(|| SchemaError::UnknownField {
                schema: self.schema.name().to_string(),
                field: field.to_string(),
            })?;

        let declared = &self.schema.fields()[position];
        if !declared.field_type.accepts(&value) {
            return Err(SchemaError::TypeMismatch {
                schema: self.schema.name().to_string(),
                field: field.to_string(),
                expected: declared.field_type.type_name(),
                actual: json_type_name(&value),
            });
        }

        self.values[position] = value;
        Ok(())
    }

    /// Builder form of `set`
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> SchemaResult<Self> {
        self.set(field, value)?;
        Ok(self)
    }

    /// Value of a field; `None` when the field is unknown or unset
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.schema
            .position(field)
            .map(|i| &self.values[i])
            .filter(|v| !v.is_null())
    }

    /// Value of a field, `null` when unknown or unset
    pub fn get_or_null(&self, field: &str) -> &Value {
        self.get(field).unwrap_or(&Value::Null)
    }

    /// Declared fields paired with their current values
    pub fn fields(&self) -> impl Iterator<Item = (&FieldDescriptor, &Value)> + '_ {
        self.schema.fields().iter().zip(self.values.iter())
    }

    /// The identity of this record.
    ///
    /// Single-field identities yield the bare value. Multi-part identities
    /// yield a record of the identity-only type.
    pub fn identity(&self) -> IdentityKey {
        if !self.schema.is_composite() {
            let value = self
                .schema
                .identity_fields()
                .next()
                .map(|f| self.get_or_null(&f.name).clone())
                .unwrap_or(Value::Null);
            return IdentityKey::Value(value);
        }

        let id_schema = self.schema.identity_schema();
        let values = id_schema
            .fields()
            .iter()
            .map(|f| self.get_or_null(&f.name).clone())
            .collect();
        IdentityKey::Record(Record {
            schema: id_schema,
            values,
        })
    }

    /// Set fields as a JSON object; null slots are omitted
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (field, value) in self.fields() {
            if !value.is_null() {
                map.insert(field.name.clone(), value.clone());
            }
        }
        Value::Object(map)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema && self.values == other.values
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.schema.name(), self.to_json())
    }
}

/// Anything that can name a stored record: a bare identity value, a full
/// record, or an identity-only record.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentityKey {
    /// Literal value of a single-field identity
    Value(Value),
    /// A record carrying the identity fields in its own schema
    Record(Record),
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::Value(value) => write!(f, "{}", value),
            IdentityKey::Record(record) => write!(f, "{}", record),
        }
    }
}

impl From<Record> for IdentityKey {
    fn from(record: Record) -> Self {
        IdentityKey::Record(record)
    }
}

impl From<&Record> for IdentityKey {
    fn from(record: &Record) -> Self {
        IdentityKey::Record(record.clone())
    }
}

impl From<Value> for IdentityKey {
    fn from(value: Value) -> Self {
        IdentityKey::Value(value)
    }
}

impl From<&str> for IdentityKey {
    fn from(value: &str) -> Self {
        IdentityKey::Value(Value::from(value))
    }
}

impl From<String> for IdentityKey {
    fn from(value: String) -> Self {
        IdentityKey::Value(Value::from(value))
    }
}

impl From<i64> for IdentityKey {
    fn from(value: i64) -> Self {
        IdentityKey::Value(Value::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use serde_json::json;

    fn person() -> Arc<SchemaDescriptor> {
        SchemaDescriptor::builder("Person")
            .identity("id", FieldType::String)
            .field("age", FieldType::Int)
            .build()
            .unwrap()
    }

    fn pair() -> Arc<SchemaDescriptor> {
        SchemaDescriptor::builder("Pair")
            .identity("key", FieldType::String)
            .identity("name", FieldType::String)
            .field("long_prop", FieldType::Int)
            .build()
            .unwrap()
    }

    #[test]
    fn test_set_and_get() {
        let record = Record::new(person())
            .with("id", "1")
            .unwrap()
            .with("age", 30)
            .unwrap();

        assert_eq!(record.get("id"), Some(&json!("1")));
        assert_eq!(record.get("age"), Some(&json!(30)));
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn test_set_rejects_wrong_type() {
        let mut record = Record::new(person());
        let err = record.set("age", "thirty").unwrap_err();
        assert_eq!(err.code(), "SCHEMA_TYPE_MISMATCH");
        assert_eq!(record.get("age"), None);
    }

    #[test]
    fn test_set_rejects_unknown_field() {
        let mut record = Record::new(person());
        let err = record.set("height", 180).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownField { .. }));
    }

    #[test]
    fn test_single_identity_is_bare_value() {
        let record = Record::new(person()).with("id", "7").unwrap();
        assert_eq!(record.identity(), IdentityKey::Value(json!("7")));
    }

    #[test]
    fn test_composite_identity_is_identity_record() {
        let record = Record::new(pair())
            .with("key", "k")
            .unwrap()
            .with("name", "n")
            .unwrap()
            .with("long_prop", 5)
            .unwrap();

        match record.identity() {
            IdentityKey::Record(id) => {
                assert_eq!(id.schema().name(), "PairId");
                assert_eq!(id.get("key"), Some(&json!("k")));
                assert_eq!(id.get("name"), Some(&json!("n")));
                assert_eq!(id.get("long_prop"), None);
            }
            other => panic!("expected identity record, got {:?}", other),
        }
    }

    #[test]
    fn test_to_json_omits_unset() {
        let record = Record::new(person()).with("id", "1").unwrap();
        assert_eq!(record.to_json(), json!({"id": "1"}));
        assert_eq!(record.to_string(), "Person{\"id\":\"1\"}");
    }
}
