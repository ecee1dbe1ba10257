//! Shared fixtures for the storage integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use akidb_core::{CollectionId, CoreError, CoreResult, DocumentId, VectorDocument, VectorIndex};
use akidb_index::FlatIndex;
use akidb_storage::{
    CircuitBreakerConfig, DLQEntry, FileWALConfig, MockConfig, MockObjectStore, RetryConfig,
    StorageBackend, StorageConfig, StorageObserver, StoreError, Transition,
};
use async_trait::async_trait;
use parking_lot::Mutex;

pub const DIM: usize = 8;

pub fn doc() -> VectorDocument {
    VectorDocument::new(DocumentId::new(), vec![0.25; DIM])
}

/// Mock store with no latency and call history enabled.
pub fn fast_store() -> Arc<MockObjectStore> {
    Arc::new(MockObjectStore::new_with_config(MockConfig {
        latency: Duration::ZERO,
        track_history: true,
    }))
}

pub fn forbidden() -> StoreError {
    StoreError::Unauthorized("403 Forbidden".to_string())
}

pub fn unavailable() -> StoreError {
    StoreError::http(503, "Service Unavailable")
}

/// Retry timings in milliseconds so tests finish quickly.
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 15,
        base_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(40),
        breaker_defer: Duration::from_millis(50),
        poll_interval: Duration::from_millis(20),
    }
}

/// A breaker that never trips on its own.
pub fn lenient_breaker() -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        min_requests: 1_000_000,
        ..Default::default()
    }
}

pub fn test_config(collection_id: CollectionId, data_dir: &Path) -> StorageConfig {
    StorageConfig::new(collection_id, DIM, data_dir)
        .with_wal_config(FileWALConfig {
            sync_on_write: false,
            ..Default::default()
        })
        .with_retry_config(fast_retry())
        .with_shutdown_timeout(Duration::from_secs(5))
}

pub async fn start(config: StorageConfig, store: Arc<MockObjectStore>) -> StorageBackend {
    StorageBackend::new(config, Arc::new(FlatIndex::new(DIM)), store)
        .await
        .expect("backend should start")
}

/// Poll `check` every 10ms until it returns true or `timeout` elapses.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Observer that remembers what it was told.
#[derive(Default)]
pub struct RecordingObserver {
    pub transitions: Mutex<Vec<Transition>>,
    pub evicted: AtomicUsize,
    pub expired: AtomicUsize,
}

impl StorageObserver for RecordingObserver {
    fn circuit_breaker_transition(&self, transition: &Transition) {
        self.transitions.lock().push(transition.clone());
    }

    fn dlq_evicted(&self, _entry: &DLQEntry) {
        self.evicted.fetch_add(1, Ordering::SeqCst);
    }

    fn dlq_expired(&self, count: usize) {
        self.expired.fetch_add(count, Ordering::SeqCst);
    }
}

/// Index that can be told to fail every call.
pub struct FailingIndex {
    inner: FlatIndex,
    pub fail: AtomicBool,
}

impl FailingIndex {
    pub fn new() -> Self {
        Self {
            inner: FlatIndex::new(DIM),
            fail: AtomicBool::new(false),
        }
    }

    fn check(&self) -> CoreResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CoreError::internal("index unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for FailingIndex {
    fn dimension(&self) -> usize {
        DIM
    }

    async fn insert(&self, doc: VectorDocument) -> CoreResult<()> {
        self.check()?;
        self.inner.insert(doc).await
    }

    fn contains(&self, doc_id: &DocumentId) -> bool {
        self.inner.contains(doc_id)
    }

    async fn get(&self, doc_id: &DocumentId) -> CoreResult<Option<VectorDocument>> {
        self.check()?;
        self.inner.get(doc_id).await
    }

    async fn count(&self) -> CoreResult<usize> {
        self.check()?;
        self.inner.count().await
    }
}
