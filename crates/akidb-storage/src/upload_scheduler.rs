//! Upload scheduler with bounded concurrency
//!
//! Groups pending entries into batches of `batch_size` and runs up to
//! `max_concurrency` batches at once. Failures are reported per entry: one
//! entry failing never fails its siblings or other batches.

use std::collections::HashSet;
use std::sync::Arc;

use akidb_core::{CollectionId, CoreError, CoreResult, DocumentId, VectorDocument};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::compression::{self, CompressionConfig};
use crate::object_store::{ObjectStore, StoreError};
use crate::wal::LogSequenceNumber;

/// Upload configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Entries per batch (default: 10)
    pub batch_size: usize,
    /// Batches in flight at once (default: 5)
    pub max_concurrency: usize,
    /// Per-entry compression
    pub compression: CompressionConfig,
    /// Object key prefix (default: "vectors")
    pub key_prefix: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_concurrency: 5,
            compression: CompressionConfig::default(),
            key_prefix: "vectors".to_string(),
        }
    }
}

impl UploadConfig {
    /// Validate configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.batch_size == 0 {
            return Err(CoreError::ValidationError(
                "batch_size must be > 0".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(CoreError::ValidationError(
                "max_concurrency must be > 0".to_string(),
            ));
        }
        if self.max_concurrency > 50 {
            return Err(CoreError::ValidationError(
                "max_concurrency too high (max: 50, risk of remote throttling)".to_string(),
            ));
        }
        self.compression.validate()
    }

    /// Entries one dispatch cycle can carry.
    pub fn cycle_capacity(&self) -> usize {
        self.batch_size.saturating_mul(self.max_concurrency)
    }
}

/// A logged document waiting to be uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadItem {
    /// WAL sequence of the document
    pub sequence: LogSequenceNumber,
    pub collection_id: CollectionId,
    pub document: VectorDocument,
}

/// A completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub sequence: LogSequenceNumber,
    pub key: String,
    /// Serialized size before compression
    pub raw_bytes: usize,
    /// Size actually sent
    pub stored_bytes: usize,
}

/// A failed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub sequence: LogSequenceNumber,
    pub error: StoreError,
}

/// Per-entry results of one dispatch.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub succeeded: Vec<UploadReceipt>,
    pub failed: Vec<UploadFailure>,
    /// Batches dispatched
    pub batches: usize,
}

impl DispatchReport {
    pub fn raw_bytes(&self) -> u64 {
        self.succeeded.iter().map(|r| r.raw_bytes as u64).sum()
    }

    pub fn stored_bytes(&self) -> u64 {
        self.succeeded.iter().map(|r| r.stored_bytes as u64).sum()
    }

    /// raw / stored over the successful uploads; 1.0 when nothing was stored.
    pub fn compression_ratio(&self) -> f64 {
        let stored = self.stored_bytes();
        if stored == 0 {
            return 1.0;
        }
        self.raw_bytes() as f64 / stored as f64
    }
}

/// Remote key for a document.
///
/// `{prefix}/{collection_id}/{doc_id}.json`, with `.gz` appended when compressed.
pub fn object_key(
    prefix: &str,
    collection_id: &CollectionId,
    doc_id: &DocumentId,
    compressed: bool,
) -> String {
    let ext = if compressed { "json.gz" } else { "json" };
    format!("{prefix}/{collection_id}/{doc_id}.{ext}")
}

/// Parallel per-entry uploader
pub struct UploadScheduler {
    store: Arc<dyn ObjectStore>,
    config: UploadConfig,
    semaphore: Arc<Semaphore>,
}

impl UploadScheduler {
    /// Create new upload scheduler
    pub fn new(store: Arc<dyn ObjectStore>, config: UploadConfig) -> CoreResult<Self> {
        config.validate()?;
        let semaphore = Arc::new(Semaphore::new(config.max_concurrency));

        Ok(Self {
            store,
            config,
            semaphore,
        })
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Upload `items`, returning a result for every one of them.
    pub async fn dispatch(&self, items: Vec<UploadItem>) -> DispatchReport {
        let mut report = DispatchReport::default();
        if items.is_empty() {
            return report;
        }

        let mut outstanding: HashSet<LogSequenceNumber> =
            items.iter().map(|item| item.sequence).collect();

        let batches: Vec<Vec<UploadItem>> = items
            .chunks(self.config.batch_size)
            .map(<[UploadItem]>::to_vec)
            .collect();
        report.batches = batches.len();

        let mut join_set = JoinSet::new();
        for batch in batches {
            let store = self.store.clone();
            let semaphore = self.semaphore.clone();
            let config = self.config.clone();

            join_set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return Vec::new();
                };

                let mut results = Vec::with_capacity(batch.len());
                for item in batch {
                    results.push(upload_one(store.as_ref(), &config, item).await);
                }
                results
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(results) => {
                    for result in results {
                        match result {
                            Ok(receipt) => {
                                outstanding.remove(&receipt.sequence);
                                report.succeeded.push(receipt);
                            }
                            Err(failure) => {
                                outstanding.remove(&failure.sequence);
                                report.failed.push(failure);
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "upload batch task failed");
                }
            }
        }

        // Anything a batch never reported on is a failure of that entry.
        for sequence in outstanding {
            report.failed.push(UploadFailure {
                sequence,
                error: StoreError::Other("upload task did not complete".to_string()),
            });
        }

        tracing::debug!(
            batches = report.batches,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            compression_ratio = report.compression_ratio(),
            "upload dispatch complete"
        );

        report
    }
}

async fn upload_one(
    store: &dyn ObjectStore,
    config: &UploadConfig,
    item: UploadItem,
) -> Result<UploadReceipt, UploadFailure> {
    let failure = |error: StoreError| UploadFailure {
        sequence: item.sequence,
        error,
    };

    let json = serde_json::to_vec(&item.document)
        .map_err(|e| failure(StoreError::InvalidRequest(format!("serialize document: {e}"))))?;
    let payload = compression::encode(json, config.compression)
        .map_err(|e| failure(StoreError::InvalidRequest(e.to_string())))?;

    let key = object_key(
        &config.key_prefix,
        &item.collection_id,
        &item.document.doc_id,
        payload.compressed,
    );
    let raw_bytes = payload.original_size;
    let stored_bytes = payload.stored_size();

    store
        .put(&key, payload.bytes)
        .await
        .map_err(failure)?;

    tracing::trace!(
        sequence = item.sequence.value(),
        doc_id = %item.document.doc_id,
        key = %key,
        "uploaded document"
    );

    Ok(UploadReceipt {
        sequence: item.sequence,
        key,
        raw_bytes,
        stored_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::{MockConfig, MockFailure, MockObjectStore};
    use std::time::Duration;

    fn items(n: u64, collection_id: CollectionId) -> Vec<UploadItem> {
        (1..=n)
            .map(|seq| UploadItem {
                sequence: LogSequenceNumber::new(seq),
                collection_id,
                document: VectorDocument::new(DocumentId::new(), vec![0.5; 64]),
            })
            .collect()
    }

    fn fast_mock() -> MockObjectStore {
        MockObjectStore::new_with_config(MockConfig {
            latency: Duration::ZERO,
            track_history: true,
        })
    }

    #[tokio::test]
    async fn test_dispatch_uploads_every_item() {
        let store = Arc::new(fast_mock());
        let scheduler = UploadScheduler::new(store.clone(), UploadConfig::default()).unwrap();
        let collection_id = CollectionId::new();

        let report = scheduler.dispatch(items(25, collection_id)).await;

        assert_eq!(report.batches, 3);
        assert_eq!(report.succeeded.len(), 25);
        assert!(report.failed.is_empty());
        assert_eq!(store.storage_size(), 25);
        assert!(report.succeeded[0]
            .key
            .starts_with(&format!("vectors/{collection_id}/")));
        assert!(report.succeeded[0].key.ends_with(".json"));
    }

    #[tokio::test]
    async fn test_failure_is_per_entry() {
        let store = Arc::new(fast_mock());
        store.push_failures([MockFailure::Ok, MockFailure::forbidden()]);
        let config = UploadConfig {
            batch_size: 4,
            max_concurrency: 1,
            ..Default::default()
        };
        let scheduler = UploadScheduler::new(store.clone(), config).unwrap();

        let report = scheduler.dispatch(items(4, CollectionId::new())).await;

        assert_eq!(report.succeeded.len(), 3);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].sequence, LogSequenceNumber::new(2));
        assert!(matches!(report.failed[0].error, StoreError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_compression_records_ratio() {
        let store = Arc::new(fast_mock());
        let config = UploadConfig {
            compression: CompressionConfig::gzip(),
            ..Default::default()
        };
        let scheduler = UploadScheduler::new(store.clone(), config).unwrap();

        let report = scheduler.dispatch(items(3, CollectionId::new())).await;

        assert_eq!(report.succeeded.len(), 3);
        assert!(report.succeeded[0].key.ends_with(".json.gz"));
        assert!(report.compression_ratio() > 1.0);
        let stored = store.object(&report.succeeded[0].key).unwrap();
        assert!(compression::is_gzip(&stored));
    }

    #[tokio::test]
    async fn test_empty_dispatch() {
        let scheduler = UploadScheduler::new(Arc::new(fast_mock()), UploadConfig::default()).unwrap();
        let report = scheduler.dispatch(Vec::new()).await;
        assert_eq!(report.batches, 0);
        assert_eq!(report.compression_ratio(), 1.0);
    }

    #[test]
    fn test_config_validation() {
        assert!(UploadConfig::default().validate().is_ok());
        assert_eq!(UploadConfig::default().cycle_capacity(), 50);
        let bad = UploadConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
