//! Upload journal: the per-collection ledger of logged documents and their upload state.

use super::{LogEntry, LogSequenceNumber, WriteAheadLog};
use akidb_core::{CollectionId, CoreResult, DocumentId, VectorDocument};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Upload state of a logged document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalState {
    /// Logged, not yet acknowledged by the remote store
    Pending,
    /// Acknowledged by the remote store
    Uploaded,
    /// Given up on and handed to the dead letter queue
    DeadLettered,
}

/// A logged document together with its upload state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    /// LSN of the `Upsert` record
    pub sequence: LogSequenceNumber,
    /// Document as logged
    pub document: VectorDocument,
    /// Current upload state
    pub state: WalState,
}

/// Result of replaying the log on startup.
#[derive(Debug, Clone, Default)]
pub struct RecoveredJournal {
    /// Entries above the checkpoint, in LSN order
    pub entries: Vec<WalEntry>,
    /// Checkpoint the replay started after
    pub checkpoint: LogSequenceNumber,
}

/// Result of a compaction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CompactionStats {
    /// Uploaded or dead-lettered entries dropped from the ledger
    pub trimmed: usize,
    /// Checkpoint watermark after the pass
    pub watermark: LogSequenceNumber,
}

/// Ledger over a [`WriteAheadLog`] tracking which logged documents still need uploading.
///
/// The ledger lock is held across WAL appends so that the in-memory view and
/// the LSN counter never disagree during compaction.
pub struct UploadJournal {
    collection_id: CollectionId,
    wal: Arc<dyn WriteAheadLog>,
    entries: RwLock<BTreeMap<LogSequenceNumber, WalEntry>>,
}

impl UploadJournal {
    /// Create an empty journal over `wal`. Call [`recover`](Self::recover) to load existing state.
    pub fn new(collection_id: CollectionId, wal: Arc<dyn WriteAheadLog>) -> Self {
        Self {
            collection_id,
            wal,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Log `doc` as pending upload.
    pub async fn append_pending(&self, doc: &VectorDocument) -> CoreResult<WalEntry> {
        let mut entries = self.entries.write().await;
        let sequence = self
            .wal
            .append(LogEntry::upsert(self.collection_id, doc))
            .await?;

        let entry = WalEntry {
            sequence,
            document: doc.clone(),
            state: WalState::Pending,
        };
        entries.insert(sequence, entry.clone());
        Ok(entry)
    }

    /// Record the upload of `sequence`.
    ///
    /// Returns `false` if the entry is unknown or already resolved.
    pub async fn mark_uploaded(&self, sequence: LogSequenceNumber) -> CoreResult<bool> {
        self.resolve(sequence, WalState::Uploaded).await
    }

    /// Record that `sequence` was moved to the dead letter queue.
    ///
    /// The entry no longer holds back compaction and is not re-queued on recovery.
    /// Returns `false` if the entry is unknown or already resolved.
    pub async fn mark_dead_lettered(&self, sequence: LogSequenceNumber) -> CoreResult<bool> {
        self.resolve(sequence, WalState::DeadLettered).await
    }

    async fn resolve(&self, sequence: LogSequenceNumber, state: WalState) -> CoreResult<bool> {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(&sequence) else {
            return Ok(false);
        };
        if entry.state != WalState::Pending {
            return Ok(false);
        }

        let collection_id = self.collection_id;
        let doc_id = entry.document.doc_id;
        let timestamp = chrono::Utc::now();
        let marker = match state {
            WalState::DeadLettered => LogEntry::DeadLettered {
                collection_id,
                sequence,
                doc_id,
                timestamp,
            },
            WalState::Uploaded | WalState::Pending => LogEntry::Uploaded {
                collection_id,
                sequence,
                doc_id,
                timestamp,
            },
        };

        self.wal.append(marker).await?;
        entry.state = state;
        Ok(true)
    }

    /// Upload state of `sequence`, if it is still in the ledger.
    pub async fn state(&self, sequence: LogSequenceNumber) -> Option<WalState> {
        self.entries.read().await.get(&sequence).map(|e| e.state)
    }

    /// Ledger entry for `sequence`.
    pub async fn get(&self, sequence: LogSequenceNumber) -> Option<WalEntry> {
        self.entries.read().await.get(&sequence).cloned()
    }

    /// Every ledger entry in LSN order.
    pub async fn entries(&self) -> Vec<WalEntry> {
        self.entries.read().await.values().cloned().collect()
    }

    /// Entries still awaiting upload, in LSN order.
    pub async fn pending_entries(&self) -> Vec<WalEntry> {
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.state == WalState::Pending)
            .cloned()
            .collect()
    }

    pub async fn pending_count(&self) -> usize {
        self.count_in(WalState::Pending).await
    }

    pub async fn uploaded_count(&self) -> usize {
        self.count_in(WalState::Uploaded).await
    }

    pub async fn dead_lettered_count(&self) -> usize {
        self.count_in(WalState::DeadLettered).await
    }

    /// Entries in a terminal state, eligible for compaction.
    pub async fn resolved_count(&self) -> usize {
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.state != WalState::Pending)
            .count()
    }

    async fn count_in(&self, state: WalState) -> usize {
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.state == state)
            .count()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Whether a document with this id is in the ledger.
    pub async fn contains_document(&self, doc_id: &DocumentId) -> bool {
        self.entries
            .read()
            .await
            .values()
            .any(|e| &e.document.doc_id == doc_id)
    }

    /// Rebuild the ledger from the log, starting after the last checkpoint.
    ///
    /// Entries for other collections are ignored. Markers whose upsert was
    /// never seen are ignored too.
    pub async fn recover(&self) -> CoreResult<RecoveredJournal> {
        let checkpoint = self.wal.checkpoint_lsn().await?;
        let from = checkpoint.checked_next().unwrap_or(checkpoint);
        let replayed = self.wal.replay(from).await?;

        let mut rebuilt: BTreeMap<LogSequenceNumber, WalEntry> = BTreeMap::new();
        let mut skipped = 0usize;

        for (lsn, entry) in replayed {
            if entry
                .collection_id()
                .is_some_and(|id| id != self.collection_id)
            {
                skipped += 1;
                continue;
            }

            match entry {
                LogEntry::Upsert { .. } => {
                    if let Some(document) = entry.to_document() {
                        rebuilt.insert(
                            lsn,
                            WalEntry {
                                sequence: lsn,
                                document,
                                state: WalState::Pending,
                            },
                        );
                    }
                }
                LogEntry::Uploaded { sequence, .. } => {
                    if let Some(existing) = rebuilt.get_mut(&sequence) {
                        existing.state = WalState::Uploaded;
                    }
                }
                LogEntry::DeadLettered { sequence, .. } => {
                    if let Some(existing) = rebuilt.get_mut(&sequence) {
                        existing.state = WalState::DeadLettered;
                    }
                }
                LogEntry::Checkpoint { .. } => {}
            }
        }

        if skipped > 0 {
            tracing::warn!(
                collection_id = %self.collection_id,
                skipped,
                "ignored WAL entries belonging to another collection"
            );
        }

        let entries: Vec<WalEntry> = rebuilt.values().cloned().collect();
        *self.entries.write().await = rebuilt;

        tracing::info!(
            collection_id = %self.collection_id,
            checkpoint = checkpoint.value(),
            recovered = entries.len(),
            "upload journal recovered"
        );

        Ok(RecoveredJournal {
            entries,
            checkpoint,
        })
    }

    /// Drop uploaded and dead-lettered entries from the ledger and advance the checkpoint.
    ///
    /// The watermark stops just below the oldest pending entry, so a pending
    /// document is never discarded from the log.
    pub async fn compact(&self) -> CoreResult<CompactionStats> {
        let (trimmed, watermark) = {
            let mut entries = self.entries.write().await;
            let current = self.wal.current_lsn().await?;

            let before = entries.len();
            entries.retain(|_, e| e.state == WalState::Pending);
            let trimmed = before - entries.len();

            let watermark = entries
                .keys()
                .next()
                .map_or(current, |oldest_pending| oldest_pending.prev());
            (trimmed, watermark)
        };

        let previous = self.wal.checkpoint_lsn().await?;
        if watermark > previous {
            self.wal.rotate().await?;
            self.wal.checkpoint(watermark).await?;
            tracing::debug!(
                collection_id = %self.collection_id,
                trimmed,
                watermark = watermark.value(),
                "WAL checkpoint advanced"
            );
        }

        Ok(CompactionStats {
            trimmed,
            watermark: watermark.max(previous),
        })
    }

    /// Force buffered log writes to disk.
    pub async fn flush(&self) -> CoreResult<()> {
        self.wal.flush().await
    }
}
