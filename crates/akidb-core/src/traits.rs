use async_trait::async_trait;

use crate::error::CoreResult;
use crate::ids::DocumentId;
use crate::vector::VectorDocument;

/// In-memory index collaborator used by the storage backend.
///
/// The backend only relies on membership and insertion; similarity search
/// lives behind other traits and is never called from the durability path.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Dimension every inserted vector must have.
    fn dimension(&self) -> usize;

    /// Inserts a vector document into the index.
    ///
    /// Fails with `ValidationError` on a dimension mismatch, `AlreadyExists`
    /// on a duplicate id and `Cancelled` when the index refuses new writes.
    async fn insert(&self, doc: VectorDocument) -> CoreResult<()>;

    /// Returns whether a document with this id is resident.
    fn contains(&self, doc_id: &DocumentId) -> bool;

    /// Retrieves a document by ID.
    async fn get(&self, doc_id: &DocumentId) -> CoreResult<Option<VectorDocument>>;

    /// Returns the total number of documents in the index.
    async fn count(&self) -> CoreResult<usize>;
}
