//! Background workers owned by `StorageBackend`.
//!
//! Four cooperative loops share one [`UploadPipeline`]:
//! - upload: drains the FIFO upload queue through the scheduler
//! - retry: re-attempts failed or deferred uploads once they are due
//! - compaction: trims resolved entries from the journal and checkpoints the WAL
//! - DLQ maintenance: periodic persist and TTL expiry
//!
//! Every loop exits when the shutdown channel flips to `true` (or its sender is dropped).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use akidb_core::{CollectionId, CoreResult};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{watch, Notify};

use crate::circuit_breaker::{CircuitBreaker, Permit};
use crate::config::CompactionConfig;
use crate::dlq::{DLQEntry, DeadLetterQueue};
use crate::error_classifier::{self, ErrorClass};
use crate::metrics::StorageMetrics;
use crate::object_store::StoreError;
use crate::retry::{DeadLetterReason, PendingUpload, RetryConfig, RetryDecision, RetryQueue};
use crate::upload_scheduler::{UploadItem, UploadReceipt, UploadScheduler};
use crate::wal::{CompactionStats, UploadJournal};

/// Shared state the workers and the backend operate on.
#[derive(Clone)]
pub(crate) struct UploadPipeline {
    pub collection_id: CollectionId,
    pub scheduler: Arc<UploadScheduler>,
    pub circuit_breaker: Arc<CircuitBreaker>,
    pub dead_letter_queue: Arc<DeadLetterQueue>,
    pub journal: Arc<UploadJournal>,
    pub upload_queue: Arc<Mutex<VecDeque<UploadItem>>>,
    pub upload_notify: Arc<Notify>,
    pub retry_queue: Arc<RetryQueue>,
    pub compaction_notify: Arc<Notify>,
    pub metrics: Arc<RwLock<StorageMetrics>>,
    pub retry_config: RetryConfig,
    pub compaction_config: CompactionConfig,
}

impl UploadPipeline {
    /// Run one dispatch cycle from the upload queue.
    ///
    /// Returns `true` if items are still queued afterwards.
    pub async fn drain_upload_queue(&self) -> bool {
        let capacity = self.scheduler.config().cycle_capacity();
        let batch: Vec<UploadItem> = {
            let mut queue = self.upload_queue.lock();
            let n = queue.len().min(capacity);
            queue.drain(..n).collect()
        };

        if batch.is_empty() {
            return false;
        }

        let now = Instant::now();
        let pending: Vec<PendingUpload> = batch
            .into_iter()
            .map(|item| PendingUpload::new(item, now))
            .collect();
        self.gate_and_deliver(pending, now).await;

        !self.upload_queue.lock().is_empty()
    }

    /// Re-attempt every retry that is due at `now`, up to one cycle's capacity.
    pub async fn retry_due(&self, now: Instant) {
        let capacity = self.scheduler.config().cycle_capacity();
        let ready = self.retry_queue.take_ready(now, capacity);
        if ready.is_empty() {
            return;
        }

        tracing::debug!(
            collection_id = %self.collection_id,
            count = ready.len(),
            "retrying failed uploads"
        );
        self.gate_and_deliver(ready, now).await;
    }

    /// Ask the breaker for permits; deliver what it grants and defer the rest.
    async fn gate_and_deliver(&self, pending: Vec<PendingUpload>, now: Instant) {
        let permit = self.circuit_breaker.try_acquire(pending.len());

        let mut pending = pending.into_iter();
        let to_send: Vec<PendingUpload> = pending.by_ref().take(permit.granted()).collect();

        let mut deferred = 0u64;
        for mut upload in pending {
            upload.defer(now + self.retry_config.breaker_defer);
            self.retry_queue.push(upload);
            deferred += 1;
        }

        if deferred > 0 {
            self.metrics.write().breaker_deferrals += deferred;
            tracing::debug!(
                collection_id = %self.collection_id,
                deferred,
                state = %self.circuit_breaker.state(),
                "circuit breaker deferred uploads"
            );
        }

        if !to_send.is_empty() {
            self.deliver(to_send, permit).await;
        }
    }

    async fn deliver(&self, pending: Vec<PendingUpload>, permit: Permit) {
        let items: Vec<UploadItem> = pending.iter().map(|p| p.item.clone()).collect();
        let report = self.scheduler.dispatch(items).await;

        let mut by_sequence: HashMap<_, PendingUpload> = pending
            .into_iter()
            .map(|p| (p.item.sequence, p))
            .collect();

        for receipt in report.succeeded {
            self.circuit_breaker.record_result(permit, true);
            if let Some(upload) = by_sequence.remove(&receipt.sequence) {
                self.on_uploaded(upload, &receipt).await;
            }
        }

        for failure in report.failed {
            self.circuit_breaker.record_result(permit, false);
            if let Some(upload) = by_sequence.remove(&failure.sequence) {
                self.on_failed(upload, failure.error).await;
            }
        }
    }

    async fn on_uploaded(&self, upload: PendingUpload, receipt: &UploadReceipt) {
        let sequence = upload.item.sequence;
        if let Err(e) = self.journal.mark_uploaded(sequence).await {
            // The upload happened; a lost marker only means a repeat upload after restart.
            tracing::error!(
                collection_id = %self.collection_id,
                sequence = sequence.value(),
                error = %e,
                "failed to record upload in WAL"
            );
        }

        {
            let mut metrics = self.metrics.write();
            metrics.uploads += 1;
            metrics.bytes_uploaded_raw += receipt.raw_bytes as u64;
            metrics.bytes_uploaded_stored += receipt.stored_bytes as u64;
            if upload.attempts > 0 {
                metrics.retries += 1;
            }
        }

        if upload.attempts > 0 {
            tracing::info!(
                collection_id = %self.collection_id,
                sequence = sequence.value(),
                doc_id = %upload.item.document.doc_id,
                attempts = upload.attempts,
                "upload succeeded after retry"
            );
        }

        self.notify_compaction_if_due().await;
    }

    async fn on_failed(&self, mut upload: PendingUpload, error: StoreError) {
        let class = error_classifier::classify(&error);
        self.metrics.write().upload_failures += 1;

        let decision = upload.on_failure(&error, class, &self.retry_config, Instant::now(), Utc::now());
        match decision {
            RetryDecision::Retry {
                attempt,
                next_attempt_at,
            } => {
                tracing::warn!(
                    collection_id = %self.collection_id,
                    sequence = upload.item.sequence.value(),
                    doc_id = %upload.item.document.doc_id,
                    attempt,
                    delay_ms = next_attempt_at.saturating_duration_since(Instant::now()).as_millis() as u64,
                    error = %error,
                    "upload failed, scheduled retry"
                );
                self.retry_queue.push(upload);
            }
            RetryDecision::DeadLetter(reason) => {
                self.move_to_dlq(upload, reason, class).await;
            }
        }
    }

    async fn move_to_dlq(&self, upload: PendingUpload, reason: DeadLetterReason, class: ErrorClass) {
        let now = Utc::now();
        let entry = DLQEntry::new(
            self.collection_id,
            upload.item.sequence,
            upload.item.document,
            reason.to_string(),
            class,
            upload.attempts,
            upload.first_failed_at.unwrap_or(now),
            self.dead_letter_queue.config().ttl_seconds,
        );

        tracing::error!(
            collection_id = %self.collection_id,
            sequence = entry.sequence.value(),
            doc_id = %entry.document_id,
            attempts = entry.attempts,
            reason = %entry.failure_reason,
            "moving upload to dead letter queue"
        );

        let sequence = entry.sequence;
        self.dead_letter_queue.push(entry);

        {
            let mut metrics = self.metrics.write();
            metrics.permanent_failures += 1;
            metrics.dlq_size = self.dead_letter_queue.len();
        }

        if let Err(e) = self.journal.mark_dead_lettered(sequence).await {
            tracing::error!(
                collection_id = %self.collection_id,
                sequence = sequence.value(),
                error = %e,
                "failed to record dead letter in WAL"
            );
        }
        self.notify_compaction_if_due().await;
    }

    async fn notify_compaction_if_due(&self) {
        if self.journal.resolved_count().await >= self.compaction_config.min_uploaded_entries {
            self.compaction_notify.notify_one();
        }
    }

    /// Compact the journal and record it in metrics.
    pub async fn run_compaction(&self) -> CoreResult<CompactionStats> {
        let stats = self.journal.compact().await?;

        {
            let mut metrics = self.metrics.write();
            metrics.compactions += 1;
            metrics.last_compaction_at = Some(Utc::now());
        }

        tracing::info!(
            collection_id = %self.collection_id,
            trimmed = stats.trimmed,
            watermark = stats.watermark.value(),
            "compaction complete"
        );
        Ok(stats)
    }

    async fn compact_if_due(&self) {
        if self.journal.resolved_count().await < self.compaction_config.min_uploaded_entries {
            return;
        }
        if let Err(e) = self.run_compaction().await {
            tracing::error!(
                collection_id = %self.collection_id,
                error = %e,
                "compaction failed"
            );
        }
    }

    async fn persist_dlq(&self) {
        if let Err(e) = self.dead_letter_queue.persist().await {
            tracing::error!(
                collection_id = %self.collection_id,
                error = %e,
                "DLQ persistence failed"
            );
        }
    }
}

/// Wait for a shutdown change. Returns `true` if the worker should stop.
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) -> bool {
    match shutdown.changed().await {
        Ok(()) => *shutdown.borrow(),
        Err(_) => true,
    }
}

/// Background worker for first-attempt uploads.
pub(crate) async fn run_upload_worker(pipeline: UploadPipeline, mut shutdown: watch::Receiver<bool>) {
    tracing::info!(collection_id = %pipeline.collection_id, "upload worker started");
    let poll_interval = pipeline.retry_config.poll_interval;

    loop {
        if *shutdown.borrow() {
            break;
        }

        if pipeline.drain_upload_queue().await {
            continue;
        }

        tokio::select! {
            stop = stop_requested(&mut shutdown) => {
                if stop {
                    break;
                }
            }
            () = pipeline.upload_notify.notified() => {}
            () = tokio::time::sleep(poll_interval) => {}
        }
    }

    tracing::info!(collection_id = %pipeline.collection_id, "upload worker stopped");
}

/// Background worker that retries failed and deferred uploads.
///
/// - Polls the retry queue every `poll_interval`
/// - Asks the circuit breaker before each attempt; an open breaker defers
///   items without consuming an attempt
/// - Uses exponential backoff (1s → 2s → 4s → ... → 64s)
/// - Moves items to the DLQ on permanent errors or after `max_attempts`
pub(crate) async fn run_retry_worker(pipeline: UploadPipeline, mut shutdown: watch::Receiver<bool>) {
    tracing::info!(collection_id = %pipeline.collection_id, "retry worker started");
    let poll_interval = pipeline.retry_config.poll_interval;

    loop {
        tokio::select! {
            stop = stop_requested(&mut shutdown) => {
                if stop {
                    break;
                }
            }
            () = tokio::time::sleep(poll_interval) => {}
        }

        if *shutdown.borrow() {
            break;
        }
        pipeline.retry_due(Instant::now()).await;
    }

    tracing::info!(collection_id = %pipeline.collection_id, "retry worker stopped");
}

/// Background worker that performs compaction asynchronously.
///
/// **Trigger Conditions:**
/// - Notification from the upload path once the resolved count crosses the threshold
/// - Periodic check every `compaction.interval` (fallback)
pub(crate) async fn run_compaction_worker(pipeline: UploadPipeline, mut shutdown: watch::Receiver<bool>) {
    tracing::info!(collection_id = %pipeline.collection_id, "compaction worker started");
    let interval = pipeline.compaction_config.interval;
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);

    loop {
        tokio::select! {
            stop = stop_requested(&mut shutdown) => {
                if stop {
                    break;
                }
                continue;
            }
            () = pipeline.compaction_notify.notified() => {}
            _ = ticker.tick() => {}
        }

        pipeline.compact_if_due().await;
    }

    tracing::info!(collection_id = %pipeline.collection_id, "compaction worker stopped");
}

/// Background worker for DLQ persistence and expiry.
///
/// Persists every `flush_interval_seconds` and sweeps expired entries every
/// `cleanup_interval_seconds`, persisting again after a sweep that removed anything.
pub(crate) async fn run_dlq_maintenance_worker(
    pipeline: UploadPipeline,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(collection_id = %pipeline.collection_id, "DLQ maintenance worker started");

    let config = pipeline.dead_letter_queue.config().clone();
    let flush_every = std::time::Duration::from_secs(config.flush_interval_seconds);
    let sweep_every = std::time::Duration::from_secs(config.cleanup_interval_seconds);
    let start = tokio::time::Instant::now();
    let mut flush = tokio::time::interval_at(start + flush_every, flush_every);
    let mut sweep = tokio::time::interval_at(start + sweep_every, sweep_every);

    loop {
        tokio::select! {
            stop = stop_requested(&mut shutdown) => {
                if stop {
                    break;
                }
            }
            _ = flush.tick() => pipeline.persist_dlq().await,
            _ = sweep.tick() => {
                let expired = pipeline.dead_letter_queue.expire_stale(Utc::now());
                if expired > 0 {
                    pipeline.metrics.write().dlq_size = pipeline.dead_letter_queue.len();
                    pipeline.persist_dlq().await;
                }
            }
        }
    }

    tracing::info!(collection_id = %pipeline.collection_id, "DLQ maintenance worker stopped");
}
