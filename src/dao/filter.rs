//! Identity filters
//!
//! Builds the equality filter that addresses one stored document. Clauses
//! follow identity declaration order. Identity values are read from the
//! input's own schema, so an identity-only record of a multi-part identity
//! addresses the same document as the full record.

use std::sync::Arc;

use serde_json::Value;

use super::errors::{DaoError, DaoResult};
use crate::record::IdentityKey;
use crate::schema::SchemaDescriptor;
use crate::store::Filter;

/// Filter builder for one record type
#[derive(Debug, Clone)]
pub struct IdentityFilterBuilder {
    record_type: String,
    identity: Vec<String>,
}

impl IdentityFilterBuilder {
    pub fn new(schema: &Arc<SchemaDescriptor>) -> Self {
        Self {
            record_type: schema.name().to_string(),
            identity: schema.identity_names(),
        }
    }

    /// Identity fields in declaration order
    pub fn identity(&self) -> &[String] {
        &self.identity
    }

    pub fn build(&self, key: &IdentityKey) -> DaoResult<Filter> {
        let mut filter = Filter::new();

        match key {
            IdentityKey::Record(record) => {
                for field in &self.identity {
                    if record.schema().field(field).is_none() {
                        return Err(self.invalid(format!(
                            "{} has no identity field '{}'",
                            record.schema().name(),
                            field
                        )));
                    }
                    let value = record.get(field).ok_or_else(|| {
                        self.invalid(format!("identity field '{}' is not set", field))
                    })?;
                    filter.push(field.as_str(), value.clone());
                }
            }
            IdentityKey::Value(value) => {
                let field = match self.identity.as_slice() {
                    [single] => single,
                    _ => {
                        return Err(self.invalid(format!(
                            "bare value {} cannot address a {}-part identity",
                            value,
                            self.identity.len()
                        )))
                    }
                };
                if value.is_null() {
                    return Err(self.invalid("identity value is null".to_string()));
                }
                filter.push(field.as_str(), Value::clone(value));
            }
        }

        Ok(filter)
    }

    fn invalid(&self, message: String) -> DaoError {
        DaoError::InvalidIdentity {
            record_type: self.record_type.clone(),
            message,
        }
    }
}
