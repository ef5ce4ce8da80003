//! Schema error types

use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Schema errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Descriptor has no name
    #[error("schema name must not be empty")]
    EmptyName,

    /// The same field name was declared twice
    #[error("schema '{schema}' declares field '{field}' more than once")]
    DuplicateField { schema: String, field: String },

    /// No field is flagged as part of the identity
    #[error("schema '{schema}' has no identity field")]
    NoIdentity { schema: String },

    /// Identity fields must always be stored
    #[error("identity field '{field}' of schema '{schema}' cannot be transient")]
    TransientIdentity { schema: String, field: String },

    /// Field is not declared by the schema
    #[error("schema '{schema}' has no field '{field}'")]
    UnknownField { schema: String, field: String },

    /// Value does not match the declared field type
    #[error("field '{field}' of schema '{schema}' expects {expected}, got {actual}")]
    TypeMismatch {
        schema: String,
        field: String,
        expected: &'static str,
        actual: &'static str,
    },
}

impl SchemaError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::EmptyName => "SCHEMA_EMPTY_NAME",
            SchemaError::DuplicateField { .. } => "SCHEMA_DUPLICATE_FIELD",
            SchemaError::NoIdentity { .. } => "SCHEMA_NO_IDENTITY",
            SchemaError::TransientIdentity { .. } => "SCHEMA_TRANSIENT_IDENTITY",
            SchemaError::UnknownField { .. } => "SCHEMA_UNKNOWN_FIELD",
            SchemaError::TypeMismatch { .. } => "SCHEMA_TYPE_MISMATCH",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_field_and_schema() {
        let err = SchemaError::TypeMismatch {
            schema: "Person".into(),
            field: "age".into(),
            expected: "int",
            actual: "string",
        };
        let display = err.to_string();
        assert!(display.contains("Person"));
        assert!(display.contains("age"));
        assert!(display.contains("int"));
        assert_eq!(err.code(), "SCHEMA_TYPE_MISMATCH");
    }
}
