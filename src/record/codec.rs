//! Record codec
//!
//! Maps records to documents and back using the record type's schema.
//! A codec owns a scratch buffer for byte encoding; the buffer is cleared
//! before every use and a codec is never shared between concurrent calls.

use std::sync::Arc;

use serde_json::Value;

use super::errors::{CodecError, CodecResult};
use super::typed::Record;
use crate::schema::{json_type_name, SchemaDescriptor};
use crate::store::Document;

/// Encoder/decoder for one record type
#[derive(Debug)]
pub struct RecordCodec {
    schema: Arc<SchemaDescriptor>,
    buffer: Vec<u8>,
}

impl RecordCodec {
    /// Create a codec for `schema`
    pub fn new(schema: Arc<SchemaDescriptor>) -> Self {
        Self {
            schema,
            buffer: Vec::new(),
        }
    }

    /// Schema this codec decodes into
    pub fn schema(&self) -> &Arc<SchemaDescriptor> {
        &self.schema
    }

    /// Drop any state left from a previous use
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Encode storable, set fields into a document
    pub fn encode(&self, record: &Record) -> Document {
        let mut document = Document::new();
        for (field, value) in record.fields() {
            if field.is_storable() && !value.is_null() {
                document.insert(field.name.clone(), value.clone());
            }
        }
        document
    }

    /// Decode a document into a record of this codec's type.
    ///
    /// Keys the schema does not declare are ignored. Identity fields must be
    /// present and non-null.
    pub fn decode(&self, document: &Document) -> CodecResult<Record> {
        let mut record = Record::new(Arc::clone(&self.schema));

        for field in self.schema.fields() {
            if !field.is_storable() {
                continue;
            }
            let value = document.get(&field.name).unwrap_or(&Value::Null);

            if value.is_null() {
                if field.identity {
                    return Err(self.decode_error(
                        format!("identity field '{}' is missing", field.name),
                        document,
                    ));
                }
                continue;
            }

            if !field.field_type.accepts(value) {
                return Err(self.decode_error(
                    format!(
                        "field '{}' expects {}, got {}",
                        field.name,
                        field.field_type,
                        json_type_name(value)
                    ),
                    document,
                ));
            }

            record
                .set(&field.name, value.clone())
                .map_err(|e| self.decode_error(e.to_string(), document))?;
        }

        Ok(record)
    }

    /// Serialize a record's document form into the scratch buffer
    pub fn to_bytes(&mut self, record: &Record) -> CodecResult<&[u8]> {
        self.buffer.clear();
        let document = self.encode(record);
        serde_json::to_writer(&mut self.buffer, &document).map_err(|e| CodecError::Encode {
            record_type: self.schema.name().to_string(),
            message: e.to_string(),
        })?;
        Ok(&self.buffer)
    }

    /// Parse bytes produced by `to_bytes`
    pub fn from_bytes(&mut self, bytes: &[u8]) -> CodecResult<Record> {
        self.buffer.clear();
        self.buffer.extend_from_slice(bytes);

        let parsed: Value = serde_json::from_slice(&self.buffer).map_err(|e| CodecError::Decode {
            record_type: self.schema.name().to_string(),
            message: e.to_string(),
            payload: String::from_utf8_lossy(&self.buffer).into_owned(),
        })?;

        match parsed {
            Value::Object(document) => self.decode(&document),
            other => Err(CodecError::Decode {
                record_type: self.schema.name().to_string(),
                message: format!("expected object, got {}", json_type_name(&other)),
                payload: other.to_string(),
            }),
        }
    }

    fn decode_error(&self, message: String, document: &Document) -> CodecError {
        CodecError::Decode {
            record_type: self.schema.name().to_string(),
            message,
            payload: Value::Object(document.clone()).to_string(),
        }
    }
}
