//! Documents held by a collection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;

/// Name of the identity property.
pub const ID_PROPERTY: &str = "id";

/// A JSON object with a string `id`.
///
/// The id is the document's identity for upserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Document(Value);

impl Document {
    /// Wrap a JSON value, checking it is an object with a non-empty string id.
    pub fn new(value: Value) -> Result<Self, StoreError> {
        match value.get(ID_PROPERTY) {
            _ if !value.is_object() => Err(StoreError::InvalidDocument(
                "document is not a JSON object".to_string(),
            )),
            Some(Value::String(id)) if !id.is_empty() => Ok(Self(value)),
            Some(_) => Err(StoreError::InvalidDocument(
                "document id must be a non-empty string".to_string(),
            )),
            None => Err(StoreError::InvalidDocument("document has no id".to_string())),
        }
    }

    /// Decode a document from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Encode the document as JSON bytes.
    pub fn to_vec(&self) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(&self.0)?)
    }

    pub fn id(&self) -> &str {
        self.0
            .get(ID_PROPERTY)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Look up a value by collection path (`/a/b`), which is a JSON pointer.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.0.pointer(path)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl TryFrom<Value> for Document {
    type Error = StoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Document::new(value)
    }
}

impl From<Document> for Value {
    fn from(document: Document) -> Self {
        document.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_requires_string_id() {
        assert!(Document::new(json!({"id": "a", "n": 1})).is_ok());
        assert!(Document::new(json!({"n": 1})).is_err());
        assert!(Document::new(json!({"id": 7})).is_err());
        assert!(Document::new(json!({"id": ""})).is_err());
        assert!(Document::new(json!(["id", "a"])).is_err());
    }

    #[test]
    fn test_path_lookup() {
        let doc = Document::new(json!({"id": "a", "address": {"city": "Oslo"}})).unwrap();
        assert_eq!(doc.id(), "a");
        assert_eq!(doc.get("/address/city"), Some(&json!("Oslo")));
        assert_eq!(doc.get("/address/zip"), None);
    }

    #[test]
    fn test_bytes_reject_invalid_documents() {
        let doc = Document::new(json!({"id": "a", "n": 1})).unwrap();
        let bytes = doc.to_vec().unwrap();
        assert_eq!(Document::from_slice(&bytes).unwrap(), doc);
        assert!(Document::from_slice(br#"{"n": 1}"#).is_err());
    }
}
