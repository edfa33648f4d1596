//! JSON documents and conversions to typed records.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::StoreError;

/// A stored document: a JSON object keyed by field name.
pub type Document = serde_json::Map<String, Value>;

/// Serializes a record into a document.
///
/// Fails with [`StoreError::Codec`] if the record does not serialize to a
/// JSON object.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Codec(serde::ser::Error::custom(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        )))),
    }
}

/// Deserializes a document into a record.
pub fn from_document<T: DeserializeOwned>(document: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(document))?)
}

/// Applies `patch` to `target` field by field: every field present in the
/// patch replaces the stored one, fields absent from the patch are kept.
pub fn merge_document(target: &mut Document, patch: Document) {
    for (field, value) in patch {
        target.insert(field, value);
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
