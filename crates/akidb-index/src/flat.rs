//! Flat in-memory index.
//!
//! Documents are kept in a hash map keyed by id. Inserts validate the
//! dimension and reject duplicates so callers can rely on "insert succeeded"
//! meaning "the document is resident and unique".

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use akidb_core::{CoreError, CoreResult, DocumentId, VectorDocument, VectorIndex};

/// Flat in-memory index.
///
/// # Example
///
/// ```
/// use akidb_core::{DocumentId, VectorDocument, VectorIndex};
/// use akidb_index::FlatIndex;
///
/// # #[tokio::main]
/// # async fn main() -> akidb_core::CoreResult<()> {
/// let index = FlatIndex::new(3);
/// let doc = VectorDocument::new(DocumentId::new(), vec![0.1, 0.2, 0.3]);
/// let id = doc.doc_id;
/// index.insert(doc).await?;
/// assert!(index.contains(&id));
/// # Ok(())
/// # }
/// ```
pub struct FlatIndex {
    dim: usize,
    documents: Arc<RwLock<HashMap<DocumentId, VectorDocument>>>,
    sealed: AtomicBool,
}

impl FlatIndex {
    /// Creates an empty index for vectors of `dim` components.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            documents: Arc::new(RwLock::new(HashMap::new())),
            sealed: AtomicBool::new(false),
        }
    }

    /// Stops accepting writes; later inserts fail with `Cancelled`.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::SeqCst);
    }

    /// Re-opens a sealed index for writes.
    pub fn unseal(&self) {
        self.sealed.store(false, Ordering::SeqCst);
    }

    /// Number of resident documents (synchronous helper for tests and health checks).
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Returns `true` when no document is resident.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

#[async_trait]
impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.dim
    }

    async fn insert(&self, doc: VectorDocument) -> CoreResult<()> {
        if self.sealed.load(Ordering::SeqCst) {
            return Err(CoreError::Cancelled(format!(
                "index is sealed, rejected document {}",
                doc.doc_id
            )));
        }

        if doc.vector.len() != self.dim {
            return Err(CoreError::ValidationError(format!(
                "vector dimension mismatch: expected {}, got {}",
                self.dim,
                doc.vector.len()
            )));
        }

        let mut docs = self.documents.write();
        if docs.contains_key(&doc.doc_id) {
            return Err(CoreError::already_exists("document", doc.doc_id.to_string()));
        }
        tracing::trace!(doc_id = %doc.doc_id, "indexed document");
        docs.insert(doc.doc_id, doc);
        Ok(())
    }

    fn contains(&self, doc_id: &DocumentId) -> bool {
        self.documents.read().contains_key(doc_id)
    }

    async fn get(&self, doc_id: &DocumentId) -> CoreResult<Option<VectorDocument>> {
        Ok(self.documents.read().get(doc_id).cloned())
    }

    async fn count(&self) -> CoreResult<usize> {
        Ok(self.documents.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_get() {
        let index = FlatIndex::new(3);
        let doc = VectorDocument::new(DocumentId::new(), vec![1.0, 2.0, 3.0]);
        let id = doc.doc_id;

        index.insert(doc.clone()).await.unwrap();

        assert!(index.contains(&id));
        assert_eq!(index.get(&id).await.unwrap(), Some(doc));
        assert_eq!(index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rejects_dimension_mismatch() {
        let index = FlatIndex::new(3);
        let doc = VectorDocument::new(DocumentId::new(), vec![1.0, 2.0]);
        let id = doc.doc_id;

        let err = index.insert(doc).await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
        assert!(!index.contains(&id));
    }

    #[tokio::test]
    async fn rejects_duplicate_ids() {
        let index = FlatIndex::new(2);
        let id = DocumentId::new();
        index
            .insert(VectorDocument::new(id, vec![0.0, 1.0]))
            .await
            .unwrap();

        let err = index
            .insert(VectorDocument::new(id, vec![1.0, 0.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists { .. }));
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn sealed_index_cancels_writes() {
        let index = FlatIndex::new(2);
        index.seal();

        let err = index
            .insert(VectorDocument::new(DocumentId::new(), vec![0.0, 1.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Cancelled(_)));
        assert!(index.is_empty());

        index.unseal();
        index
            .insert(VectorDocument::new(DocumentId::new(), vec![0.0, 1.0]))
            .await
            .unwrap();
        assert_eq!(index.len(), 1);
    }
}
