//! Durability core for AkiDB's tiered vector storage.
//!
//! A [`StorageBackend`] accepts a document once it is in the in-memory index
//! and durably logged in the WAL, then uploads it to an [`ObjectStore`] in
//! the background. Remote failures are classified, retried with backoff,
//! gated by a [`CircuitBreaker`] and finally parked in a [`DeadLetterQueue`].

pub mod admin;
pub mod circuit_breaker;
pub mod compression;
pub mod config;
pub mod dlq;
pub mod error_classifier;
pub mod metrics;
pub mod object_store;
pub mod retry;
pub mod storage_backend;
pub mod telemetry;
pub mod upload_scheduler;
pub mod wal;

mod workers;

pub use admin::{
    CircuitBreakerResetReport, CollectionHealth, ComponentHealth, DlqRetryReport,
    HealthComponents, HealthReport, HealthStatus, RegistryHealthReport, StorageRegistry,
};
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot, CircuitBreakerState,
    Permit, Transition, TransitionReason,
};
pub use compression::CompressionConfig;
pub use config::{
    CompactionConfig, ConfigError, LogFormat, LoggingSettings, StorageConfig, StorageSettings,
};
pub use dlq::{DLQConfig, DLQEntry, DLQMetrics, DeadLetterQueue};
pub use error_classifier::{classify, ErrorClass};
pub use metrics::StorageMetrics;
pub use object_store::{
    LocalObjectStore, MockConfig, MockFailure, MockObjectStore, ObjectMetadata, ObjectStore,
    StoreError, StoreResult,
};
pub use retry::{
    calculate_backoff, DeadLetterReason, PendingUpload, RetryConfig, RetryDecision, RetryQueue,
    RetryState,
};
pub use storage_backend::StorageBackend;
pub use telemetry::{init_tracing, NoopObserver, StorageObserver, TracingObserver};
pub use upload_scheduler::{
    DispatchReport, UploadConfig, UploadFailure, UploadItem, UploadReceipt, UploadScheduler,
};
pub use wal::{
    CompactionStats, FileWAL, FileWALConfig, LogEntry, LogSequenceNumber, UploadJournal, WalEntry,
    WalState, WriteAheadLog,
};
