//! Document store access.
//!
//! Records are kept in a collection-based document database. The
//! [`DocumentStore`] trait is the seam between the services and whatever
//! backs it: Firestore over REST in production, or an in-process map for
//! development and tests.
//!
//! Documents are plain JSON field maps; services encode and decode their
//! own record types with [`encode`] and [`Document::decode`].

mod error;
mod firestore;
mod memory;
mod wire;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use error::StoreError;
pub use firestore::{FirestoreConfig, FirestoreStore};
pub use memory::MemoryStore;

/// A document's fields.
pub type Fields = serde_json::Map<String, Value>;

/// A stored document and its identifier.
#[derive(Debug, Clone, PartialEq)]
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

    /// Decode the fields into a record type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
    }
}

/// Encode a record type as document fields. The value must serialize to a JSON object.
pub fn encode<T: Serialize>(record: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(record)? {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::Json {
            message: format!("expected a JSON object, got {other}"),
        }),
    }
}

/// A collection-based document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document, or `None` if it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Create a document with a store-assigned id and return the id.
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    /// Create or overwrite a document under a known id.
    ///
    /// With `merge`, only the given fields are written and the rest are kept.
    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), StoreError>;

    /// Overwrite the given fields of an existing document.
    ///
    /// Fails with [`StoreError::NotFound`] if the document does not exist.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Delete an existing document.
    ///
    /// Fails with [`StoreError::NotFound`] if the document does not exist.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Documents whose `field` equals `value`.
    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Record {
        user_id: String,
        count: u32,
    }

    #[test]
    fn encode_then_decode() {
        let record = Record {
            user_id: "u1".into(),
            count: 3,
        };
        let fields = encode(&record).unwrap();
        assert_eq!(fields["userId"], json!("u1"));

        let doc = Document::new("d1", fields);
        assert_eq!(doc.decode::<Record>().unwrap(), record);
    }

    #[test]
    fn encode_rejects_non_objects() {
        assert!(matches!(encode(&42), Err(StoreError::Json { .. })));
    }

    #[test]
    fn decode_reports_shape_mismatch() {
        let doc = Document::new("d1", encode(&json!({"userId": 5})).unwrap());
        assert!(matches!(doc.decode::<Record>(), Err(StoreError::Json { .. })));
    }
}
