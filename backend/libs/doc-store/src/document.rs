use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-shaped document body
pub type Fields = serde_json::Map<String, Value>;

/// A stored document: store-assigned identity plus its fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Kind of change reported on a change stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
}

/// One entry of a change batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChange {
    pub change_type: ChangeType,
    pub doc: Document,
}

impl DocumentChange {
    pub fn new(change_type: ChangeType, doc: Document) -> Self {
        Self { change_type, doc }
    }
}

/// Body of a document about to be created
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewDocument {
    pub fields: Fields,
    /// Field the store stamps with its commit timestamp
    pub timestamp_field: Option<String>,
}

impl NewDocument {
    pub fn new(fields: Fields) -> Self {
        Self {
            fields,
            timestamp_field: None,
        }
    }

    /// Build from a JSON object literal
    pub fn from_json(value: Value) -> StoreResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self::new(fields)),
            other => Err(StoreError::Rejected(format!(
                "document body must be an object, got {}",
                other
            ))),
        }
    }

    pub fn with_server_timestamp(mut self, field: impl Into<String>) -> Self {
        self.timestamp_field = Some(field.into());
        self
    }
}

impl From<Fields> for NewDocument {
    fn from(fields: Fields) -> Self {
        Self::new(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_document_from_json() {
        let doc = NewDocument::from_json(json!({"content": "hi"}))
            .unwrap()
            .with_server_timestamp("createdAt");
        assert_eq!(doc.fields.get("content"), Some(&json!("hi")));
        assert_eq!(doc.timestamp_field.as_deref(), Some("createdAt"));
    }

    #[test]
    fn test_new_document_rejects_non_object() {
        let err = NewDocument::from_json(json!([1, 2])).unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
    }
}
