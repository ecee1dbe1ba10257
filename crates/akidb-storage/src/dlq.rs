//! Dead Letter Queue (DLQ) - bounded store for uploads that cannot succeed without intervention
//!
//! The DLQ holds documents whose upload failed permanently or exhausted the retry budget.
//! It provides:
//! - Size limit enforcement, evicting the oldest entry by `first_failed_at`
//! - TTL-based expiration
//! - Atomic persistence to disk (temp file + rename)
//! - Comprehensive metrics
//!
//! The queue has its own lock, independent of the insert path.

use akidb_core::{CollectionId, CoreError, CoreResult, DocumentId, VectorDocument};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error_classifier::ErrorClass;
use crate::telemetry::{NoopObserver, StorageObserver};
use crate::wal::LogSequenceNumber;

/// DLQ configuration
#[derive(Debug, Clone)]
pub struct DLQConfig {
    /// Maximum number of entries (default: 1,000)
    pub max_size: usize,
    /// Time-to-live in seconds, counted from `first_failed_at` (default: 604,800 = 7 days)
    pub ttl_seconds: i64,
    /// Where the queue is persisted; `None` keeps it in memory only.
    pub persistence_path: Option<PathBuf>,
    /// Expiry sweep interval in seconds (default: 3,600 = 1 hour)
    pub cleanup_interval_seconds: u64,
    /// Persistence interval in seconds (default: 60)
    pub flush_interval_seconds: u64,
}

impl Default for DLQConfig {
    fn default() -> Self {
        Self {
            max_size: 1_000,
            ttl_seconds: 604_800,
            persistence_path: None,
            cleanup_interval_seconds: 3_600,
            flush_interval_seconds: 60,
        }
    }
}

impl DLQConfig {
    /// Validate configuration.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_size == 0 {
            return Err(CoreError::ValidationError(
                "dlq max_size must be > 0".to_string(),
            ));
        }
        if self.ttl_seconds <= 0 {
            return Err(CoreError::ValidationError(
                "dlq ttl_seconds must be > 0".to_string(),
            ));
        }
        if self.cleanup_interval_seconds == 0 || self.flush_interval_seconds == 0 {
            return Err(CoreError::ValidationError(
                "dlq intervals must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// A dead-lettered upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DLQEntry {
    /// Unique entry ID
    pub id: Uuid,
    /// WAL sequence of the failed upload
    pub sequence: LogSequenceNumber,
    /// Document ID that failed
    pub document_id: DocumentId,
    /// Collection ID
    pub collection_id: CollectionId,
    /// Snapshot of the document as it was logged
    pub document: VectorDocument,
    /// Why the entry was dead-lettered
    pub failure_reason: String,
    /// Classification of the last error
    pub error_class: ErrorClass,
    /// Upload attempts made before giving up
    pub attempts: u32,
    /// First failed upload attempt
    pub first_failed_at: DateTime<Utc>,
    /// Last upload attempt
    pub last_attempt_at: DateTime<Utc>,
    /// When the entry expires (`first_failed_at + ttl`)
    pub expires_at: DateTime<Utc>,
}

impl DLQEntry {
    /// Create a new DLQ entry.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        collection_id: CollectionId,
        sequence: LogSequenceNumber,
        document: VectorDocument,
        failure_reason: impl Into<String>,
        error_class: ErrorClass,
        attempts: u32,
        first_failed_at: DateTime<Utc>,
        ttl_seconds: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequence,
            document_id: document.doc_id,
            collection_id,
            document,
            failure_reason: failure_reason.into(),
            error_class,
            attempts,
            first_failed_at,
            last_attempt_at: Utc::now(),
            expires_at: first_failed_at + ChronoDuration::seconds(ttl_seconds),
        }
    }

    /// Check if entry has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Age of the entry relative to `now`.
    #[must_use]
    pub fn age_at(&self, now: DateTime<Utc>) -> ChronoDuration {
        now - self.first_failed_at
    }
}

/// DLQ metrics for monitoring
#[derive(Debug, Clone, Default, Serialize)]
pub struct DLQMetrics {
    /// Current queue size
    pub size: usize,
    /// Age of oldest entry in seconds
    pub oldest_entry_age_seconds: i64,
    /// Total number of entries evicted due to size limit
    pub total_evictions: u64,
    /// Total number of expired entries removed
    pub total_expired: u64,
    /// Total number of successful persists
    pub total_persists: u64,
    /// When the queue was last written to disk
    pub last_persisted_at: Option<DateTime<Utc>>,
}

/// Dead Letter Queue for permanently failed uploads
///
/// # Examples
///
/// ```rust
/// use akidb_core::{CollectionId, DocumentId, VectorDocument};
/// use akidb_storage::dlq::{DLQConfig, DLQEntry, DeadLetterQueue};
/// use akidb_storage::error_classifier::ErrorClass;
/// use akidb_storage::wal::LogSequenceNumber;
/// use chrono::Utc;
///
/// let dlq = DeadLetterQueue::new(DLQConfig::default());
///
/// let doc = VectorDocument::new(DocumentId::new(), vec![0.1, 0.2]);
/// let entry = DLQEntry::new(
///     CollectionId::new(),
///     LogSequenceNumber::new(1),
///     doc,
///     "403 Forbidden",
///     ErrorClass::Permanent,
///     1,
///     Utc::now(),
///     604_800,
/// );
///
/// dlq.push(entry);
/// assert_eq!(dlq.len(), 1);
/// ```
pub struct DeadLetterQueue {
    entries: Arc<RwLock<VecDeque<DLQEntry>>>,
    config: DLQConfig,
    metrics: Arc<RwLock<DLQMetrics>>,
    observer: Arc<dyn StorageObserver>,
}

impl DeadLetterQueue {
    /// Create a new Dead Letter Queue
    #[must_use]
    pub fn new(config: DLQConfig) -> Self {
        Self::with_observer(config, Arc::new(NoopObserver))
    }

    /// Create a queue that reports evictions and expiries to `observer`.
    #[must_use]
    pub fn with_observer(config: DLQConfig, observer: Arc<dyn StorageObserver>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::new())),
            config,
            metrics: Arc::new(RwLock::new(DLQMetrics::default())),
            observer,
        }
    }

    /// Queue configuration.
    pub fn config(&self) -> &DLQConfig {
        &self.config
    }

    /// Add an entry, keeping the queue ordered by `first_failed_at`, then
    /// enforce the size bound. Returns whatever was evicted.
    pub fn push(&self, entry: DLQEntry) -> Vec<DLQEntry> {
        {
            let mut entries = self.entries.write();
            let position = entries
                .iter()
                .rposition(|e| e.first_failed_at <= entry.first_failed_at)
                .map_or(0, |p| p + 1);
            entries.insert(position, entry);
        }
        self.evict_oldest_if_over_capacity()
    }

    /// Evict the oldest entries while the queue is above `max_size`.
    pub fn evict_oldest_if_over_capacity(&self) -> Vec<DLQEntry> {
        let evicted: Vec<DLQEntry> = {
            let mut entries = self.entries.write();
            let excess = entries.len().saturating_sub(self.config.max_size);
            entries.drain(..excess).collect()
        };

        if !evicted.is_empty() {
            self.metrics.write().total_evictions += evicted.len() as u64;
            for entry in &evicted {
                tracing::warn!(
                    entry_id = %entry.id,
                    doc_id = %entry.document_id,
                    max_size = self.config.max_size,
                    "DLQ full, evicted oldest entry"
                );
                self.observer.dlq_evicted(entry);
            }
        }

        evicted
    }

    /// Remove entries whose TTL deadline has passed. Returns how many were removed.
    pub fn expire_stale(&self, now: DateTime<Utc>) -> usize {
        let expired = {
            let mut entries = self.entries.write();
            let before = entries.len();
            entries.retain(|entry| !entry.is_expired_at(now));
            before - entries.len()
        };

        if expired > 0 {
            self.metrics.write().total_expired += expired as u64;
            tracing::info!(expired, "DLQ expiry sweep removed entries");
            self.observer.dlq_expired(expired);
        }

        expired
    }

    /// Remove every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let count = entries.len();
        entries.clear();
        count
    }

    /// Get entry by ID
    #[must_use]
    pub fn get(&self, id: &Uuid) -> Option<DLQEntry> {
        self.entries.read().iter().find(|e| &e.id == id).cloned()
    }

    /// Remove entry by ID
    pub fn remove(&self, id: &Uuid) -> Option<DLQEntry> {
        let mut entries = self.entries.write();
        let pos = entries.iter().position(|e| &e.id == id)?;
        entries.remove(pos)
    }

    /// Whether an entry for this WAL sequence is queued.
    #[must_use]
    pub fn contains_sequence(&self, sequence: LogSequenceNumber) -> bool {
        self.entries.read().iter().any(|e| e.sequence == sequence)
    }

    /// All entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<DLQEntry> {
        self.entries.read().iter().cloned().collect()
    }

    /// Current queue size
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Check if queue is full
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() >= self.config.max_size
    }

    /// Current metrics.
    #[must_use]
    pub fn metrics(&self) -> DLQMetrics {
        let now = Utc::now();
        let (size, oldest) = {
            let entries = self.entries.read();
            (
                entries.len(),
                entries.front().map(|e| e.age_at(now).num_seconds()),
            )
        };

        let mut metrics = self.metrics.read().clone();
        metrics.size = size;
        metrics.oldest_entry_age_seconds = oldest.unwrap_or(0);
        metrics
    }

    /// Write the full queue to disk atomically.
    ///
    /// No-op without a persistence path.
    pub async fn persist(&self) -> CoreResult<()> {
        let Some(path) = self.config.persistence_path.as_ref() else {
            tracing::trace!("DLQ persistence disabled, skipping flush");
            return Ok(());
        };

        let snapshot: Vec<DLQEntry> = self.entries();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CoreError::StorageError(format!("Failed to create DLQ directory: {e}"))
            })?;
        }

        let json = serde_json::to_vec(&snapshot)
            .map_err(|e| CoreError::SerializationError(format!("Failed to serialize DLQ: {e}")))?;

        let temp_path = path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to create DLQ temp file: {e}")))?;
        file.write_all(&json)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to write DLQ file: {e}")))?;
        file.sync_all()
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to sync DLQ file: {e}")))?;
        drop(file);

        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to replace DLQ file: {e}")))?;

        {
            let mut metrics = self.metrics.write();
            metrics.total_persists += 1;
            metrics.last_persisted_at = Some(Utc::now());
        }
        tracing::debug!(entries = snapshot.len(), path = %path.display(), "DLQ persisted");

        Ok(())
    }

    /// Load the queue from disk, dropping expired entries and enforcing the bound.
    ///
    /// Returns the number of entries loaded.
    pub async fn load(&self) -> CoreResult<usize> {
        let Some(path) = self.config.persistence_path.as_ref() else {
            return Ok(0);
        };

        let json = match tokio::fs::read(path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("DLQ persistence file not found, starting with empty queue");
                return Ok(0);
            }
            Err(e) => {
                return Err(CoreError::StorageError(format!(
                    "Failed to read DLQ file: {e}"
                )))
            }
        };

        let mut loaded: Vec<DLQEntry> = serde_json::from_slice(&json).map_err(|e| {
            CoreError::DeserializationError(format!("Failed to deserialize DLQ: {e}"))
        })?;

        let now = Utc::now();
        loaded.retain(|e| !e.is_expired_at(now));
        loaded.sort_by_key(|e| e.first_failed_at);
        let excess = loaded.len().saturating_sub(self.config.max_size);
        loaded.drain(..excess);

        let count = loaded.len();
        *self.entries.write() = loaded.into();

        tracing::info!(entries = count, "DLQ loaded from disk");
        Ok(count)
    }
}
