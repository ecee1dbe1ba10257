//! Storage backend: the write path from index to WAL to remote tier.
//!
//! An insert is acknowledged only once the index has accepted the document
//! and the WAL has durably logged it. Uploading to the object store happens in
//! the background; remote failures never surface to the caller and are
//! resolved by retries, the circuit breaker and the dead letter queue.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use akidb_core::{CollectionId, CoreError, CoreResult, DocumentId, VectorDocument, VectorIndex};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

use crate::admin::{
    CircuitBreakerResetReport, ComponentHealth, DlqRetryReport, HealthComponents, HealthReport,
    HealthStatus,
};
use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerState};
use crate::compression;
use crate::config::StorageConfig;
use crate::dlq::{DLQEntry, DeadLetterQueue};
use crate::metrics::StorageMetrics;
use crate::object_store::ObjectStore;
use crate::retry::RetryQueue;
use crate::telemetry::{StorageObserver, TracingObserver};
use crate::upload_scheduler::{UploadItem, UploadScheduler};
use crate::wal::{
    CompactionStats, FileWAL, LogSequenceNumber, UploadJournal, WalEntry, WalState,
};
use crate::workers::{self, UploadPipeline};

/// Storage backend for one collection.
///
/// Owns the WAL, the upload queues, the circuit breaker, the DLQ and the
/// background workers. [`shutdown`](Self::shutdown) must be awaited before
/// the backend is dropped.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use akidb_core::{CollectionId, DocumentId, VectorDocument};
/// use akidb_index::FlatIndex;
/// use akidb_storage::{LocalObjectStore, StorageBackend, StorageConfig};
///
/// # #[tokio::main]
/// # async fn main() -> akidb_core::CoreResult<()> {
/// let config = StorageConfig::new(CollectionId::new(), 3, "./data/c1");
/// let store = Arc::new(LocalObjectStore::new("./remote").await?);
/// let backend = StorageBackend::new(config, Arc::new(FlatIndex::new(3)), store).await?;
///
/// let doc = VectorDocument::new(DocumentId::new(), vec![0.1, 0.2, 0.3]);
/// backend.insert(doc).await?;
///
/// backend.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct StorageBackend {
    collection_id: CollectionId,
    config: StorageConfig,
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn ObjectStore>,
    circuit_breaker: Arc<CircuitBreaker>,
    dead_letter_queue: Arc<DeadLetterQueue>,
    journal: Arc<UploadJournal>,
    pipeline: UploadPipeline,
    metrics: Arc<RwLock<StorageMetrics>>,

    /// Serializes index insert + WAL append + enqueue.
    write_region: tokio::sync::Mutex<()>,
    accepting: AtomicBool,
    shutdown_started: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    workers: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
    started_at: Instant,
}

impl StorageBackend {
    /// Create a backend, recover state from disk and start its workers.
    ///
    /// This will:
    /// 1. Validate configuration
    /// 2. Open the WAL under `data_dir/wal`
    /// 3. Load the persisted DLQ (failures are logged; the queue starts empty)
    /// 4. Replay the WAL into the index and re-enqueue pending uploads
    /// 5. Spawn the upload, retry, compaction and DLQ maintenance workers
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Configuration validation fails
    /// - The index dimension differs from the configured dimension
    /// - The WAL cannot be opened or replayed
    pub async fn new(
        config: StorageConfig,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn ObjectStore>,
    ) -> CoreResult<Self> {
        Self::with_observer(config, index, store, Arc::new(TracingObserver)).await
    }

    /// Like [`new`](Self::new), reporting breaker transitions and DLQ evictions to `observer`.
    pub async fn with_observer(
        config: StorageConfig,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn ObjectStore>,
        observer: Arc<dyn StorageObserver>,
    ) -> CoreResult<Self> {
        config.validate()?;
        if index.dimension() != config.dimension {
            return Err(CoreError::ValidationError(format!(
                "index dimension {} does not match configured dimension {}",
                index.dimension(),
                config.dimension
            )));
        }

        let collection_id = config.collection_id;
        tokio::fs::create_dir_all(&config.data_dir).await?;

        let wal = FileWAL::new(config.wal_dir(), config.wal.clone()).await?;
        let journal = Arc::new(UploadJournal::new(collection_id, Arc::new(wal)));

        let dead_letter_queue = Arc::new(DeadLetterQueue::with_observer(
            config.dlq.clone(),
            observer.clone(),
        ));
        if let Err(e) = dead_letter_queue.load().await {
            tracing::warn!(
                collection_id = %collection_id,
                error = %e,
                "failed to load persisted DLQ, starting empty"
            );
        }

        let circuit_breaker = Arc::new(CircuitBreaker::with_observer(
            config.circuit_breaker.clone(),
            observer,
        ));
        let scheduler = Arc::new(UploadScheduler::new(store.clone(), config.upload.clone())?);
        let metrics = Arc::new(RwLock::new(StorageMetrics::default()));

        let pipeline = UploadPipeline {
            collection_id,
            scheduler,
            circuit_breaker: circuit_breaker.clone(),
            dead_letter_queue: dead_letter_queue.clone(),
            journal: journal.clone(),
            upload_queue: Arc::new(Mutex::new(VecDeque::new())),
            upload_notify: Arc::new(Notify::new()),
            retry_queue: Arc::new(RetryQueue::new()),
            compaction_notify: Arc::new(Notify::new()),
            metrics: metrics.clone(),
            retry_config: config.retry.clone(),
            compaction_config: config.compaction.clone(),
        };

        let (shutdown_tx, _) = watch::channel(false);

        let backend = Self {
            collection_id,
            config,
            index,
            store,
            circuit_breaker,
            dead_letter_queue,
            journal,
            pipeline,
            metrics,
            write_region: tokio::sync::Mutex::new(()),
            accepting: AtomicBool::new(true),
            shutdown_started: AtomicBool::new(false),
            shutdown_tx,
            workers: Mutex::new(Vec::new()),
            started_at: Instant::now(),
        };

        backend.recover().await?;
        backend.spawn_workers();

        tracing::info!(
            collection_id = %collection_id,
            dimension = backend.config.dimension,
            "storage backend started"
        );
        Ok(backend)
    }

    /// Rebuild the index and the upload queue from the WAL (and the remote tier).
    async fn recover(&self) -> CoreResult<()> {
        let recovered = self.journal.recover().await?;

        let hydrated = if recovered.checkpoint > LogSequenceNumber::ZERO
            && self.config.hydrate_from_remote
        {
            self.hydrate_from_remote().await
        } else {
            0
        };

        let mut reindexed = 0usize;
        let mut requeued = 0usize;
        let mut dead_lettered = 0usize;

        {
            let mut queue = self.pipeline.upload_queue.lock();
            for entry in &recovered.entries {
                match entry.state {
                    WalState::Pending
                        if !self.dead_letter_queue.contains_sequence(entry.sequence) =>
                    {
                        queue.push_back(UploadItem {
                            sequence: entry.sequence,
                            collection_id: self.collection_id,
                            document: entry.document.clone(),
                        });
                        requeued += 1;
                    }
                    WalState::Pending | WalState::DeadLettered => dead_lettered += 1,
                    WalState::Uploaded => {}
                }
            }
        }

        // Dead letters outlive their WAL records once compaction trims them.
        let logged = recovered
            .entries
            .into_iter()
            .map(|entry| (entry.sequence, entry.document));
        let held = self
            .dead_letter_queue
            .entries()
            .into_iter()
            .map(|entry| (entry.sequence, entry.document));

        for (sequence, document) in logged.chain(held) {
            if self.index.contains(&document.doc_id) {
                continue;
            }
            let doc_id = document.doc_id;
            match self.index.insert(document).await {
                Ok(()) => reindexed += 1,
                Err(e) => tracing::warn!(
                    collection_id = %self.collection_id,
                    sequence = sequence.value(),
                    doc_id = %doc_id,
                    error = %e,
                    "failed to re-index logged document"
                ),
            }
        }

        if reindexed + requeued + hydrated > 0 {
            tracing::info!(
                collection_id = %self.collection_id,
                checkpoint = recovered.checkpoint.value(),
                reindexed,
                requeued,
                dead_lettered,
                hydrated,
                "recovered from WAL"
            );
        }
        Ok(())
    }

    /// Re-index documents that compaction removed from the WAL. Returns how many were loaded.
    async fn hydrate_from_remote(&self) -> usize {
        let prefix = format!(
            "{}/{}/",
            self.config.upload.key_prefix, self.collection_id
        );
        let objects = match self.store.list(&prefix).await {
            Ok(objects) => objects,
            Err(e) => {
                tracing::warn!(
                    collection_id = %self.collection_id,
                    error = %e,
                    "remote hydration skipped: list failed"
                );
                return 0;
            }
        };

        let mut loaded = 0usize;
        for object in objects {
            let doc = match self.fetch_document(&object.key).await {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(key = %object.key, error = %e, "skipping unreadable remote document");
                    continue;
                }
            };
            if self.index.contains(&doc.doc_id) {
                continue;
            }
            match self.index.insert(doc).await {
                Ok(()) => loaded += 1,
                Err(e) => tracing::warn!(key = %object.key, error = %e, "failed to index remote document"),
            }
        }
        loaded
    }

    async fn fetch_document(&self, key: &str) -> CoreResult<VectorDocument> {
        let bytes = self.store.get(key).await?;
        let json = compression::decode(bytes)?;
        Ok(serde_json::from_slice(&json)?)
    }

    fn spawn_workers(&self) {
        let mut workers = self.workers.lock();

        let pipeline = self.pipeline.clone();
        let shutdown = self.shutdown_tx.subscribe();
        workers.push((
            "upload",
            tokio::spawn(workers::run_upload_worker(pipeline, shutdown)),
        ));

        let pipeline = self.pipeline.clone();
        let shutdown = self.shutdown_tx.subscribe();
        workers.push((
            "retry",
            tokio::spawn(workers::run_retry_worker(pipeline, shutdown)),
        ));

        let pipeline = self.pipeline.clone();
        let shutdown = self.shutdown_tx.subscribe();
        workers.push((
            "compaction",
            tokio::spawn(workers::run_compaction_worker(pipeline, shutdown)),
        ));

        let pipeline = self.pipeline.clone();
        let shutdown = self.shutdown_tx.subscribe();
        workers.push((
            "dlq_maintenance",
            tokio::spawn(workers::run_dlq_maintenance_worker(pipeline, shutdown)),
        ));
    }

    /// Insert a document.
    ///
    /// Order: index insert, then WAL append, then enqueue for upload. A document
    /// the index rejects is never logged. Returns the document's WAL sequence.
    ///
    /// # Errors
    ///
    /// - `ValidationError` on dimension mismatch
    /// - `AlreadyExists` for a duplicate id
    /// - whatever the index returns if it rejects the document
    /// - `DurabilityError` if the index accepted the document but the WAL append failed
    /// - `InvalidState` after shutdown
    pub async fn insert(&self, doc: VectorDocument) -> CoreResult<LogSequenceNumber> {
        if !self.accepting.load(Ordering::Acquire) {
            return Err(CoreError::invalid_state("storage backend is shut down"));
        }

        if doc.dimension() != self.config.dimension {
            self.metrics.write().rejected_inserts += 1;
            return Err(CoreError::ValidationError(format!(
                "dimension mismatch: expected {}, got {}",
                self.config.dimension,
                doc.dimension()
            )));
        }

        let region = self.write_region.lock().await;
        if !self.accepting.load(Ordering::Acquire) {
            return Err(CoreError::invalid_state("storage backend is shut down"));
        }

        if self.index.contains(&doc.doc_id) {
            self.metrics.write().rejected_inserts += 1;
            return Err(CoreError::already_exists("document", doc.doc_id.to_string()));
        }

        if let Err(e) = self.index.insert(doc.clone()).await {
            self.metrics.write().rejected_inserts += 1;
            tracing::debug!(
                collection_id = %self.collection_id,
                doc_id = %doc.doc_id,
                error = %e,
                "index rejected document"
            );
            return Err(e);
        }

        let entry = match self.journal.append_pending(&doc).await {
            Ok(entry) => entry,
            Err(e) => {
                self.metrics.write().durability_failures += 1;
                tracing::error!(
                    collection_id = %self.collection_id,
                    doc_id = %doc.doc_id,
                    error = %e,
                    "document indexed but WAL append failed"
                );
                return Err(CoreError::DurabilityError(format!(
                    "document {} was indexed but could not be logged: {e}",
                    doc.doc_id
                )));
            }
        };

        self.pipeline.upload_queue.lock().push_back(UploadItem {
            sequence: entry.sequence,
            collection_id: self.collection_id,
            document: entry.document,
        });
        drop(region);

        self.pipeline.upload_notify.notify_one();
        self.metrics.write().inserts += 1;

        tracing::trace!(
            collection_id = %self.collection_id,
            sequence = entry.sequence.value(),
            "document logged and queued for upload"
        );
        Ok(entry.sequence)
    }

    /// Gracefully shut down the backend.
    ///
    /// In order: stop accepting inserts, signal all workers, wait for them
    /// (up to `shutdown_timeout`, aborting stragglers), flush the WAL, persist
    /// the DLQ. A second call is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the WAL flush error, if any. DLQ persistence failures are logged only.
    pub async fn shutdown(&self) -> CoreResult<()> {
        if self.shutdown_started.swap(true, Ordering::AcqRel) {
            tracing::debug!(collection_id = %self.collection_id, "shutdown already performed");
            return Ok(());
        }

        tracing::info!(collection_id = %self.collection_id, "shutting down storage backend");

        self.accepting.store(false, Ordering::Release);
        // Wait for in-flight inserts to finish their WAL append.
        let _region = self.write_region.lock().await;

        let _ = self.shutdown_tx.send(true);

        let handles = std::mem::take(&mut *self.workers.lock());
        let deadline = tokio::time::Instant::now() + self.config.shutdown_timeout;
        for (name, mut handle) in handles {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => tracing::debug!(worker = name, "worker stopped"),
                Ok(Err(e)) => tracing::warn!(worker = name, error = %e, "worker ended abnormally"),
                Err(_) => {
                    tracing::warn!(
                        worker = name,
                        timeout_ms = self.config.shutdown_timeout.as_millis() as u64,
                        "worker did not stop before the shutdown deadline, aborting"
                    );
                    handle.abort();
                }
            }
        }

        let wal_result = self.journal.flush().await;
        if let Err(e) = &wal_result {
            tracing::error!(collection_id = %self.collection_id, error = %e, "WAL flush failed during shutdown");
        }

        if let Err(e) = self.dead_letter_queue.persist().await {
            tracing::error!(collection_id = %self.collection_id, error = %e, "DLQ persistence failed during shutdown");
        }

        let pending_uploads = self.journal.pending_count().await;
        tracing::info!(
            collection_id = %self.collection_id,
            pending_uploads,
            dlq_size = self.dead_letter_queue.len(),
            "storage backend shut down"
        );
        wal_result
    }

    /// Whether `shutdown` has been called.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown_started.load(Ordering::Acquire)
    }

    pub fn collection_id(&self) -> CollectionId {
        self.collection_id
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Look up a document in the index.
    pub async fn get(&self, doc_id: &DocumentId) -> CoreResult<Option<VectorDocument>> {
        self.index.get(doc_id).await
    }

    /// Number of documents in the index.
    pub async fn count(&self) -> CoreResult<usize> {
        self.index.count().await
    }

    pub fn circuit_breaker_state(&self) -> CircuitBreakerState {
        self.circuit_breaker.state()
    }

    /// Force the circuit breaker closed.
    pub fn reset_circuit_breaker(&self) -> CircuitBreakerResetReport {
        let previous_state = self.circuit_breaker.reset();
        tracing::info!(
            collection_id = %self.collection_id,
            previous_state = %previous_state,
            "circuit breaker manually reset"
        );
        self.pipeline.upload_notify.notify_one();

        CircuitBreakerResetReport {
            collection_id: self.collection_id,
            previous_state,
            new_state: self.circuit_breaker.state(),
        }
    }

    /// Clear the DLQ.
    ///
    /// Entries are discarded, not resubmitted: every cleared entry is counted
    /// as retried and failed.
    pub async fn retry_dlq(&self) -> DlqRetryReport {
        let cleared = self.dead_letter_queue.clear();
        self.metrics.write().dlq_size = 0;

        if let Err(e) = self.dead_letter_queue.persist().await {
            tracing::error!(collection_id = %self.collection_id, error = %e, "DLQ persistence failed after clear");
        }

        tracing::warn!(
            collection_id = %self.collection_id,
            cleared,
            "DLQ cleared by operator"
        );

        DlqRetryReport {
            collection_id: self.collection_id,
            retried: cleared,
            succeeded: 0,
            failed: cleared,
        }
    }

    /// DLQ entries, oldest first.
    pub fn dead_letter_entries(&self) -> Vec<DLQEntry> {
        self.dead_letter_queue.entries()
    }

    /// Journal entries still awaiting upload.
    pub async fn pending_uploads(&self) -> Vec<WalEntry> {
        self.journal.pending_entries().await
    }

    /// Every journal entry not yet compacted away.
    pub async fn wal_entries(&self) -> Vec<WalEntry> {
        self.journal.entries().await
    }

    pub async fn wal_entry(&self, sequence: LogSequenceNumber) -> Option<WalEntry> {
        self.journal.get(sequence).await
    }

    pub async fn wal_state(&self, sequence: LogSequenceNumber) -> Option<WalState> {
        self.journal.state(sequence).await
    }

    /// Uploads waiting for a retry or a breaker deferral to elapse.
    pub fn retry_queue_len(&self) -> usize {
        self.pipeline.retry_queue.len()
    }

    /// Run a compaction now, regardless of the resolved-entry threshold.
    pub async fn compact(&self) -> CoreResult<CompactionStats> {
        self.pipeline.run_compaction().await
    }

    /// Point-in-time metrics.
    pub async fn metrics(&self) -> StorageMetrics {
        let mut metrics = self.metrics.read().clone();

        let dlq = self.dead_letter_queue.metrics();
        metrics.dlq_size = dlq.size;
        metrics.dlq_evictions = dlq.total_evictions;
        metrics.dlq_expired = dlq.total_expired;
        metrics.dlq_persists = dlq.total_persists;

        let breaker = self.circuit_breaker.snapshot();
        metrics.circuit_breaker_state = breaker.state.to_metric();
        metrics.circuit_breaker_error_rate = breaker.error_rate;

        metrics.wal_pending = self.journal.pending_count().await;
        metrics.wal_uploaded = self.journal.uploaded_count().await;
        metrics.wal_dead_lettered = self.journal.dead_lettered_count().await;
        metrics.memory_usage_bytes = self.memory_usage_bytes().await;

        metrics
    }

    /// Prometheus text exposition of [`metrics`](Self::metrics).
    pub async fn export_prometheus(&self) -> String {
        self.metrics()
            .await
            .export_prometheus(&self.collection_id.to_string())
    }

    async fn memory_usage_bytes(&self) -> u64 {
        let count = self.index.count().await.unwrap_or(0) as u64;
        count * self.config.dimension as u64 * std::mem::size_of::<f32>() as u64
    }

    /// Health of the index, the remote tier and memory.
    pub async fn health(&self) -> HealthReport {
        let index = match self.index.count().await {
            Ok(count) => ComponentHealth::healthy(format!("{count} documents indexed")),
            Err(e) => ComponentHealth::unhealthy(format!("index unreachable: {e}")),
        };

        let breaker = self.circuit_breaker.snapshot();
        let mut storage = match breaker.state {
            CircuitBreakerState::Closed => ComponentHealth::healthy("circuit breaker closed"),
            CircuitBreakerState::HalfOpen => {
                ComponentHealth::degraded("circuit breaker half-open, probing remote store")
            }
            CircuitBreakerState::Open => ComponentHealth::unhealthy(format!(
                "circuit breaker open (error rate {:.1}%)",
                breaker.error_rate * 100.0
            )),
        };
        if self.dead_letter_queue.is_full() && storage.status == HealthStatus::Healthy {
            storage = ComponentHealth::degraded(format!(
                "dead letter queue at capacity ({} entries)",
                self.dead_letter_queue.len()
            ));
        }

        let memory = match self.config.memory_limit_bytes {
            None => ComponentHealth::healthy("no memory limit configured"),
            Some(limit) => {
                let used = self.memory_usage_bytes().await;
                let ratio = used as f64 / limit as f64;
                let message = format!("{:.1}% of {} bytes", ratio * 100.0, limit);
                if ratio >= 0.90 {
                    ComponentHealth::unhealthy(message)
                } else if ratio >= 0.75 {
                    ComponentHealth::degraded(message)
                } else {
                    ComponentHealth::healthy(message)
                }
            }
        };

        let status = index.status.worst(storage.status).worst(memory.status);
        HealthReport {
            status,
            uptime_seconds: self.started_at.elapsed().as_secs(),
            components: HealthComponents {
                index,
                storage,
                memory,
            },
        }
    }
}

impl Drop for StorageBackend {
    fn drop(&mut self) {
        let handles = std::mem::take(&mut *self.workers.lock());
        if handles.is_empty() {
            return;
        }
        if !self.shutdown_started.load(Ordering::Acquire) {
            tracing::warn!(
                collection_id = %self.collection_id,
                "storage backend dropped without shutdown; aborting workers, unflushed DLQ state may be lost"
            );
        }
        for (_, handle) in handles {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::MockObjectStore;
    use akidb_index::FlatIndex;
    use tempfile::TempDir;

    async fn backend(dir: &TempDir) -> StorageBackend {
        let config = StorageConfig::new(CollectionId::new(), 2, dir.path());
        StorageBackend::new(
            config,
            Arc::new(FlatIndex::new(2)),
            Arc::new(MockObjectStore::new()),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_rejects_mismatched_index_dimension() {
        let dir = TempDir::new().unwrap();
        let config = StorageConfig::new(CollectionId::new(), 3, dir.path());
        let result = StorageBackend::new(
            config,
            Arc::new(FlatIndex::new(2)),
            Arc::new(MockObjectStore::new()),
        )
        .await;
        assert!(matches!(result, Err(CoreError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_insert_returns_increasing_sequences() {
        let dir = TempDir::new().unwrap();
        let backend = backend(&dir).await;

        let a = backend
            .insert(VectorDocument::new(DocumentId::new(), vec![1.0, 0.0]))
            .await
            .unwrap();
        let b = backend
            .insert(VectorDocument::new(DocumentId::new(), vec![0.0, 1.0]))
            .await
            .unwrap();
        assert!(b > a);
        assert_eq!(backend.count().await.unwrap(), 2);

        backend.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_health_reports_memory_pressure() {
        let dir = TempDir::new().unwrap();
        // Four documents of two f32s = 32 bytes.
        let config = StorageConfig::new(CollectionId::new(), 2, dir.path()).with_memory_limit(40);
        let backend = StorageBackend::new(
            config,
            Arc::new(FlatIndex::new(2)),
            Arc::new(MockObjectStore::new()),
        )
        .await
        .unwrap();

        assert_eq!(backend.health().await.status, HealthStatus::Healthy);
        for _ in 0..4 {
            backend
                .insert(VectorDocument::new(DocumentId::new(), vec![1.0, 1.0]))
                .await
                .unwrap();
        }

        let report = backend.health().await;
        assert_eq!(report.components.memory.status, HealthStatus::Degraded);
        assert_eq!(report.status, HealthStatus::Degraded);

        backend.shutdown().await.unwrap();
    }
}
