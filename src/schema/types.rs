//! Schema descriptors
//!
//! A descriptor is built once, at registration time, and is read-only
//! afterwards. Field order is declaration order; the identity is the subset
//! of fields flagged as identity, also in declaration order.

use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{SchemaError, SchemaResult};

/// Supported field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 string
    String,
    /// 64-bit integer
    Int,
    /// 64-bit floating point (any JSON number)
    Float,
    /// Boolean
    Bool,
    /// RFC 3339 timestamp stored as a string
    DateTime,
    /// Any JSON value, stored as-is
    Json,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::DateTime => "datetime",
            FieldType::Json => "json",
        }
    }

    /// Returns true if `value` can be held by a field of this type.
    /// `null` is accepted by every type and means "unset".
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        match self {
            FieldType::String => value.is_string(),
            FieldType::Int => value.is_i64() || value.is_u64(),
            FieldType::Float => value.is_number(),
            FieldType::Bool => value.is_boolean(),
            FieldType::DateTime => value
                .as_str()
                .map(|s| DateTime::parse_from_rfc3339(s).is_ok())
                .unwrap_or(false),
            FieldType::Json => true,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Returns a short name for the JSON type of `value`
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One declared field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name; also the document key
    pub name: String,
    /// Declared type
    pub field_type: FieldType,
    /// Part of the record identity
    #[serde(default)]
    pub identity: bool,
    /// Written to the document store
    #[serde(default = "default_storable")]
    pub storable: bool,
}

fn default_storable() -> bool {
    true
}

impl FieldDescriptor {
    /// Create a plain storable field
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            identity: false,
            storable: true,
        }
    }

    /// The storage predicate: whether this field is written to documents
    pub fn is_storable(&self) -> bool {
        self.storable
    }
}

/// Complete record-type descriptor
#[derive(Debug, Clone)]
pub struct SchemaDescriptor {
    name: String,
    fields: Vec<FieldDescriptor>,
    identity: Vec<usize>,
    identity_schema: OnceLock<Arc<SchemaDescriptor>>,
}

impl SchemaDescriptor {
    /// Start building a descriptor
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Build from a field list, validating it
    pub fn from_fields(
        name: impl Into<String>,
        fields: Vec<FieldDescriptor>,
    ) -> SchemaResult<Arc<Self>> {
        let name = name.into();
        if name.is_empty() {
            return Err(SchemaError::EmptyName);
        }

        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    schema: name,
                    field: field.name.clone(),
                });
            }
            if field.identity && !field.storable {
                return Err(SchemaError::TransientIdentity {
                    schema: name,
                    field: field.name.clone(),
                });
            }
        }

        let identity: Vec<usize> = fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.identity)
            .map(|(i, _)| i)
            .collect();

        if identity.is_empty() {
            return Err(SchemaError::NoIdentity { schema: name });
        }

        Ok(Arc::new(Self {
            name,
            fields,
            identity,
            identity_schema: OnceLock::new(),
        }))
    }

    /// Record type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All fields in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Field by name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Slot index of a field
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Identity fields in declaration order
    pub fn identity_fields(&self) -> impl Iterator<Item = &FieldDescriptor> + '_ {
        self.identity.iter().map(move |&i| &self.fields[i])
    }

    /// Identity field names in declaration order
    pub fn identity_names(&self) -> Vec<String> {
        self.identity_fields().map(|f| f.name.clone()).collect()
    }

    /// True when the identity spans more than one field
    pub fn is_composite(&self) -> bool {
        self.identity.len() > 1
    }

    /// Descriptor of the identity-only type (`<Name>Id`), holding just the
    /// identity fields. Derived once and cached.
    pub fn identity_schema(&self) -> Arc<SchemaDescriptor> {
        Arc::clone(self.identity_schema.get_or_init(|| {
            let fields: Vec<FieldDescriptor> = self.identity_fields().cloned().collect();
            let identity = (0..fields.len()).collect();
            Arc::new(SchemaDescriptor {
                name: format!("{}Id", self.name),
                fields,
                identity,
                identity_schema: OnceLock::new(),
            })
        }))
    }
}

impl PartialEq for SchemaDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.fields == other.fields
    }
}

impl Eq for SchemaDescriptor {}

/// Builder for `SchemaDescriptor`
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl SchemaBuilder {
    /// Add an identity field
    pub fn identity(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        let mut field = FieldDescriptor::new(name, field_type);
        field.identity = true;
        self.fields.push(field);
        self
    }

    /// Add a storable field
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FieldDescriptor::new(name, field_type));
        self
    }

    /// Add a field that is never written to the store
    pub fn transient(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        let mut field = FieldDescriptor::new(name, field_type);
        field.storable = false;
        self.fields.push(field);
        self
    }

    /// Validate and freeze the descriptor
    pub fn build(self) -> SchemaResult<Arc<SchemaDescriptor>> {
        SchemaDescriptor::from_fields(self.name, self.fields)
    }
}
