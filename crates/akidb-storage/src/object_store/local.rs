//! Local filesystem implementation of ObjectStore
//!
//! Objects are stored as files with the key as the relative path under a base
//! directory. Writes go through a temporary file and a rename so a reader never
//! observes a half-written object.

use super::{ObjectMetadata, ObjectStore, StoreError, StoreResult};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Local filesystem object store
///
/// # Example
///
/// ```rust,no_run
/// use akidb_storage::object_store::{LocalObjectStore, ObjectStore, StoreResult};
/// use bytes::Bytes;
///
/// #[tokio::main]
/// async fn main() -> StoreResult<()> {
///     let store = LocalObjectStore::new("./tier-data").await?;
///     store.put("vectors/c1/d1.json", Bytes::from("{}")).await?;
///
///     let objects = store.list("vectors/").await?;
///     println!("Found {} objects", objects.len());
///     Ok(())
/// }
/// ```
pub struct LocalObjectStore {
    base_dir: PathBuf,
}

impl LocalObjectStore {
    /// Create a new local object store, creating the base directory if needed.
    pub async fn new(base_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&base_dir).await?;
        Ok(Self { base_dir })
    }

    /// Base directory holding the objects.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn full_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(key)
    }

    fn path_to_key(&self, path: &Path) -> Option<String> {
        path.strip_prefix(&self.base_dir)
            .ok()
            .and_then(|p| p.to_str())
            .map(|s| s.replace(std::path::MAIN_SEPARATOR, "/"))
    }

    fn list_recursive<'a>(
        &'a self,
        dir: &'a Path,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = StoreResult<Vec<PathBuf>>> + Send + 'a>>
    {
        Box::pin(async move {
            let mut results = Vec::new();

            let mut read_dir = tokio::fs::read_dir(dir).await?;
            while let Some(entry) = read_dir.next_entry().await? {
                let path = entry.path();
                let metadata = entry.metadata().await?;

                if metadata.is_file() {
                    if path.extension().and_then(|e| e.to_str()) != Some("partial") {
                        results.push(path);
                    }
                } else if metadata.is_dir() {
                    let mut sub_results = self.list_recursive(&path).await?;
                    results.append(&mut sub_results);
                }
            }

            Ok(results)
        })
    }
}

fn modified_at(metadata: &std::fs::Metadata) -> DateTime<Utc> {
    metadata
        .modified()
        .ok()
        .and_then(|t| {
            t.duration_since(UNIX_EPOCH)
                .ok()
                .and_then(|d| DateTime::from_timestamp(d.as_secs() as i64, 0))
        })
        .unwrap_or_else(Utc::now)
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, data: Bytes) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::InvalidRequest("key cannot be empty".to_string()));
        }

        let path = self.full_path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = path.with_extension("partial");
        tokio::fs::write(&temp_path, &data).await?;
        tokio::fs::rename(&temp_path, &path).await?;

        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Bytes> {
        let path = self.full_path(key);

        let data = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(key.to_string())
            } else {
                StoreError::from(e)
            }
        })?;

        Ok(Bytes::from(data))
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(tokio::fs::try_exists(self.full_path(key)).await?)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        match tokio::fs::remove_file(self.full_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<ObjectMetadata>> {
        let mut results = Vec::new();
        for path in self.list_recursive(&self.base_dir).await? {
            let Some(key) = self.path_to_key(&path) else {
                continue;
            };
            if !key.starts_with(prefix) {
                continue;
            }
            if let Ok(metadata) = tokio::fs::metadata(&path).await {
                results.push(ObjectMetadata {
                    key,
                    size_bytes: metadata.len(),
                    last_modified: modified_at(&metadata),
                });
            }
        }

        results.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(results)
    }
}
