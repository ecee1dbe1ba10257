//! Core domain types and collaborator traits shared by the AkiDB storage crates.

pub mod error;
pub mod ids;
pub mod traits;
pub mod vector;

pub use error::{CoreError, CoreResult};
pub use ids::{CollectionId, DocumentId};
pub use traits::VectorIndex;
pub use vector::VectorDocument;
