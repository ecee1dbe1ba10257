//! Vector document type carried through the index, the WAL and the remote tier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::ids::DocumentId;

/// A vector document stored in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorDocument {
    /// Unique identifier within the collection
    pub doc_id: DocumentId,

    /// External identifier (user-provided, optional)
    pub external_id: Option<String>,

    /// Dense vector embedding
    pub vector: Vec<f32>,

    /// JSON metadata payload (user-defined)
    pub metadata: Option<JsonValue>,

    /// Timestamp when document was inserted
    pub inserted_at: DateTime<Utc>,
}

impl VectorDocument {
    /// Creates a new vector document with the given ID and vector.
    #[must_use]
    pub fn new(doc_id: DocumentId, vector: Vec<f32>) -> Self {
        Self {
            doc_id,
            external_id: None,
            vector,
            metadata: None,
            inserted_at: Utc::now(),
        }
    }

    /// Sets the external identifier (builder pattern).
    #[must_use]
    pub fn with_external_id(mut self, external_id: String) -> Self {
        self.external_id = Some(external_id);
        self
    }

    /// Sets the metadata (builder pattern).
    #[must_use]
    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Returns the dimension of the vector.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }

    /// Approximate in-memory footprint of the vector payload.
    #[must_use]
    pub fn vector_bytes(&self) -> u64 {
        (self.vector.len() * std::mem::size_of::<f32>()) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_optional_fields() {
        let doc = VectorDocument::new(DocumentId::new(), vec![0.5; 4])
            .with_external_id("ext-1".to_string())
            .with_metadata(serde_json::json!({"lang": "en"}));

        assert_eq!(doc.dimension(), 4);
        assert_eq!(doc.vector_bytes(), 16);
        assert_eq!(doc.external_id.as_deref(), Some("ext-1"));
        assert_eq!(doc.metadata.unwrap()["lang"], "en");
    }
}
