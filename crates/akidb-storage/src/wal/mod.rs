//! Write-Ahead Log (WAL) for insert durability
//!
//! Every document accepted by the index is logged here before the insert is
//! acknowledged. Each entry is assigned a monotonically increasing Log Sequence
//! Number (LSN); the LSN of an `Upsert` is the document's upload sequence.
//! `Uploaded` markers record remote acknowledgement and `DeadLettered` markers
//! record that an upload was given up on, so a restart only re-uploads what
//! never reached a terminal state.

mod file_wal;
mod journal;

pub use file_wal::{FileWAL, FileWALConfig};
pub use journal::{CompactionStats, RecoveredJournal, UploadJournal, WalEntry, WalState};

use akidb_core::{CollectionId, CoreResult, DocumentId, VectorDocument};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Log Sequence Number - monotonically increasing identifier for WAL entries
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LogSequenceNumber(u64);

impl LogSequenceNumber {
    /// Zero LSN (start of log)
    pub const ZERO: Self = Self(0);

    /// Create a new LSN
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The following LSN, or `None` at `u64::MAX`.
    ///
    /// Wrapping around would break WAL ordering, so overflow is surfaced.
    pub fn checked_next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// The preceding LSN, saturating at zero.
    pub fn prev(&self) -> Self {
        Self(self.0.saturating_sub(1))
    }

    /// Get the raw value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LogSequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LSN({})", self.0)
    }
}

impl From<u64> for LogSequenceNumber {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<LogSequenceNumber> for u64 {
    fn from(lsn: LogSequenceNumber) -> Self {
        lsn.0
    }
}

/// WAL entry types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEntry {
    /// A document accepted by the index, pending upload
    Upsert {
        collection_id: CollectionId,
        doc_id: DocumentId,
        vector: Vec<f32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        external_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<serde_json::Value>,
        timestamp: DateTime<Utc>,
    },

    /// The upload logged at `sequence` was acknowledged by the remote store
    Uploaded {
        collection_id: CollectionId,
        sequence: LogSequenceNumber,
        doc_id: DocumentId,
        timestamp: DateTime<Utc>,
    },

    /// The upload logged at `sequence` was moved to the dead letter queue
    DeadLettered {
        collection_id: CollectionId,
        sequence: LogSequenceNumber,
        doc_id: DocumentId,
        timestamp: DateTime<Utc>,
    },

    /// Checkpoint marker - every upsert at or below `lsn` is durable remotely
    Checkpoint {
        lsn: LogSequenceNumber,
        timestamp: DateTime<Utc>,
    },
}

impl LogEntry {
    /// Log record for a newly indexed document.
    pub fn upsert(collection_id: CollectionId, doc: &VectorDocument) -> Self {
        LogEntry::Upsert {
            collection_id,
            doc_id: doc.doc_id,
            vector: doc.vector.clone(),
            external_id: doc.external_id.clone(),
            metadata: doc.metadata.clone(),
            timestamp: doc.inserted_at,
        }
    }

    /// Rebuild the document carried by an `Upsert`.
    pub fn to_document(&self) -> Option<VectorDocument> {
        match self {
            LogEntry::Upsert {
                doc_id,
                vector,
                external_id,
                metadata,
                timestamp,
                ..
            } => Some(VectorDocument {
                doc_id: *doc_id,
                external_id: external_id.clone(),
                vector: vector.clone(),
                metadata: metadata.clone(),
                inserted_at: *timestamp,
            }),
            _ => None,
        }
    }

    /// Get the timestamp of this entry
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            LogEntry::Upsert { timestamp, .. }
            | LogEntry::Uploaded { timestamp, .. }
            | LogEntry::DeadLettered { timestamp, .. }
            | LogEntry::Checkpoint { timestamp, .. } => *timestamp,
        }
    }

    /// Get the collection ID if applicable
    pub fn collection_id(&self) -> Option<CollectionId> {
        match self {
            LogEntry::Upsert { collection_id, .. }
            | LogEntry::Uploaded { collection_id, .. }
            | LogEntry::DeadLettered { collection_id, .. } => Some(*collection_id),
            LogEntry::Checkpoint { .. } => None,
        }
    }

    /// Check if this is a checkpoint entry
    pub fn is_checkpoint(&self) -> bool {
        matches!(self, LogEntry::Checkpoint { .. })
    }
}

/// Write-Ahead Log trait - ensures durability before acknowledging operations
///
/// Implementations must guarantee:
/// 1. Durability: data is fsync'd before `append()` returns (when configured)
/// 2. Ordering: LSNs are strictly increasing in file order
/// 3. Recoverability: `replay()` can reconstruct state from any LSN
#[async_trait]
pub trait WriteAheadLog: Send + Sync {
    /// Append a single entry, returning its LSN.
    async fn append(&self, entry: LogEntry) -> CoreResult<LogSequenceNumber>;

    /// All entries with LSN >= `from_lsn`, in order.
    async fn replay(
        &self,
        from_lsn: LogSequenceNumber,
    ) -> CoreResult<Vec<(LogSequenceNumber, LogEntry)>>;

    /// Record that everything at or below `lsn` is durable elsewhere and
    /// discard log segments that lie entirely below it.
    async fn checkpoint(&self, lsn: LogSequenceNumber) -> CoreResult<()>;

    /// Start a new log segment.
    async fn rotate(&self) -> CoreResult<()>;

    /// Highest assigned LSN.
    async fn current_lsn(&self) -> CoreResult<LogSequenceNumber>;

    /// Latest checkpoint watermark (ZERO if none).
    async fn checkpoint_lsn(&self) -> CoreResult<LogSequenceNumber>;

    /// Force buffered writes to disk.
    async fn flush(&self) -> CoreResult<()>;
}
