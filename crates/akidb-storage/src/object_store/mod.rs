//! Object store abstraction for the remote tier.
//!
//! Implementations:
//! - `LocalObjectStore`: filesystem-backed, for single-node deployments and tests
//! - `MockObjectStore`: in-memory with scripted failures, for resilience tests
//!
//! Errors are typed (`StoreError`) so the upload path can classify them
//! without parsing strings.

mod local;
mod mock;

pub use local::LocalObjectStore;
pub use mock::{CallHistoryEntry, MockConfig, MockFailure, MockObjectStore};

use akidb_core::CoreError;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a remote object store operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The request did not complete in time.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The connection was reset or refused mid-request.
    #[error("connection reset: {0}")]
    ConnectionReset(String),

    /// The remote answered with a non-success HTTP status.
    #[error("remote returned {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// Credentials were rejected.
    #[error("access denied: {0}")]
    Unauthorized(String),

    /// The object or bucket does not exist.
    #[error("object `{0}` not found")]
    NotFound(String),

    /// The request was rejected as malformed before reaching storage.
    #[error("malformed request: {0}")]
    InvalidRequest(String),

    /// Local I/O failure while talking to the store.
    #[error("I/O error: {0}")]
    Io(String),

    /// Anything the client could not map to a more specific variant.
    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Shorthand for an HTTP status failure.
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::TimedOut => Self::Timeout(err.to_string()),
            ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionRefused
            | ErrorKind::BrokenPipe => Self::ConnectionReset(err.to_string()),
            ErrorKind::PermissionDenied => Self::Unauthorized(err.to_string()),
            ErrorKind::NotFound => Self::NotFound(err.to_string()),
            ErrorKind::InvalidInput => Self::InvalidRequest(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => CoreError::not_found("object", key),
            StoreError::InvalidRequest(msg) => CoreError::ValidationError(msg),
            other => CoreError::StorageError(other.to_string()),
        }
    }
}

/// Result alias for object store calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Object metadata returned by list operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Object key (path)
    pub key: String,
    /// Size in bytes
    pub size_bytes: u64,
    /// Last modification timestamp
    pub last_modified: DateTime<Utc>,
}

/// Object Store trait - S3-like interface for cloud/local storage
///
/// All implementations must be thread-safe (Send + Sync) and support
/// concurrent operations. Keys are UTF-8 strings treated as opaque identifiers.
///
/// # Examples
///
/// ```rust,no_run
/// use akidb_storage::object_store::{LocalObjectStore, ObjectStore, StoreResult};
/// use bytes::Bytes;
///
/// #[tokio::main]
/// async fn main() -> StoreResult<()> {
///     let store = LocalObjectStore::new("./data").await?;
///
///     store.put("test.txt", Bytes::from("Hello, World!")).await?;
///     let retrieved = store.get("test.txt").await?;
///     assert_eq!(retrieved, Bytes::from("Hello, World!"));
///
///     let objects = store.list("").await?;
///     assert_eq!(objects.len(), 1);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Put object (overwrites if exists).
    async fn put(&self, key: &str, data: Bytes) -> StoreResult<()>;

    /// Get object. Fails with `StoreError::NotFound` when absent.
    async fn get(&self, key: &str) -> StoreResult<Bytes>;

    /// Check if object exists.
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Delete object (idempotent).
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// List objects whose keys start with `prefix`, sorted by key.
    async fn list(&self, prefix: &str) -> StoreResult<Vec<ObjectMetadata>>;
}
