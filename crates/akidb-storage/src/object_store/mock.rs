//! Mock object store for testing
//!
//! In-memory store with configurable failure patterns for exercising the
//! retry path, the circuit breaker and the DLQ without a real remote tier.
//!
//! # Features
//!
//! - **Deterministic Failures**: a queue of scripted outcomes consumed in order
//! - **Outages**: a persistent failure that applies until explicitly ended
//! - **Random Failures**: flaky mode with a configurable failure rate
//! - **Call History**: every operation is recorded for assertions
//! - **Latency Simulation**: a fixed delay per call
//!
//! # Examples
//!
//! ```rust
//! use akidb_storage::object_store::{MockFailure, MockObjectStore, ObjectStore};
//! use bytes::Bytes;
//!
//! # async fn example() {
//! let mock = MockObjectStore::new_with_failures(vec![
//!     MockFailure::unavailable(),
//!     MockFailure::timeout(),
//!     MockFailure::Ok,
//! ]);
//!
//! assert!(mock.put("key1", Bytes::from("data1")).await.is_err());
//! assert!(mock.put("key2", Bytes::from("data2")).await.is_err());
//! assert!(mock.put("key3", Bytes::from("data3")).await.is_ok());
//!
//! assert_eq!(mock.failed_puts(), 2);
//! assert_eq!(mock.successful_puts(), 1);
//! # }
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{ObjectMetadata, ObjectStore, StoreError, StoreResult};

/// Scripted outcome for one mock call.
#[derive(Debug, Clone)]
pub enum MockFailure {
    /// Fail the call with this error.
    Error(StoreError),

    /// Let the call through.
    Ok,
}

impl MockFailure {
    /// 503 Service Unavailable (transient).
    pub fn unavailable() -> Self {
        Self::Error(StoreError::http(503, "Service Unavailable"))
    }

    /// Request timeout (transient).
    pub fn timeout() -> Self {
        Self::Error(StoreError::Timeout("simulated timeout".to_string()))
    }

    /// 403 Forbidden (permanent).
    pub fn forbidden() -> Self {
        Self::Error(StoreError::Unauthorized("403 Forbidden".to_string()))
    }
}

/// Mock configuration.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Simulated network latency per call.
    pub latency: Duration,

    /// Enable call history tracking.
    pub track_history: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(10),
            track_history: true,
        }
    }
}

/// Mock call history entry.
#[derive(Debug, Clone)]
pub struct CallHistoryEntry {
    /// Operation type: "put", "get", "delete", "list", "exists".
    pub operation: &'static str,

    /// Object key (or prefix for list).
    pub key: String,

    /// Whether operation succeeded.
    pub success: bool,

    /// Timestamp of operation.
    pub timestamp: Instant,
}

/// In-memory object store with scriptable failures.
pub struct MockObjectStore {
    storage: Arc<RwLock<BTreeMap<String, Bytes>>>,
    failure_queue: Arc<RwLock<VecDeque<MockFailure>>>,
    outage: Arc<RwLock<Option<StoreError>>>,
    config: MockConfig,
    call_history: Arc<RwLock<Vec<CallHistoryEntry>>>,
}

impl MockObjectStore {
    /// Create a mock with default config and no failures.
    pub fn new() -> Self {
        Self::new_with_config(MockConfig::default())
    }

    /// Create a mock with custom config.
    pub fn new_with_config(config: MockConfig) -> Self {
        Self {
            storage: Arc::new(RwLock::new(BTreeMap::new())),
            failure_queue: Arc::new(RwLock::new(VecDeque::new())),
            outage: Arc::new(RwLock::new(None)),
            config,
            call_history: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Create a mock with a deterministic failure pattern.
    ///
    /// Outcomes are consumed in order; once the queue is empty every call succeeds.
    pub fn new_with_failures(pattern: Vec<MockFailure>) -> Self {
        let mock = Self::new();
        mock.push_failures(pattern);
        mock
    }

    /// Create a mock whose every call fails with `error` until `end_outage`.
    pub fn new_always_fail(error: StoreError) -> Self {
        let mock = Self::new();
        mock.start_outage(error);
        mock
    }

    /// Create a mock with intermittent transient failures.
    ///
    /// Generates a random sequence of 100 outcomes based on `failure_rate` (0.0-1.0).
    pub fn new_flaky(failure_rate: f64) -> Self {
        use rand::Rng;

        let mut rng = rand::thread_rng();
        let pattern = (0..100)
            .map(|_| {
                if rng.gen::<f64>() < failure_rate {
                    MockFailure::timeout()
                } else {
                    MockFailure::Ok
                }
            })
            .collect();

        Self::new_with_failures(pattern)
    }

    /// Append scripted outcomes to the failure queue.
    pub fn push_failures(&self, pattern: impl IntoIterator<Item = MockFailure>) {
        self.failure_queue.write().extend(pattern);
    }

    /// Fail every call with `error` until `end_outage` is called.
    pub fn start_outage(&self, error: StoreError) {
        *self.outage.write() = Some(error);
    }

    /// End a persistent outage.
    pub fn end_outage(&self) {
        *self.outage.write() = None;
    }

    /// Get call history for assertions.
    pub fn get_call_history(&self) -> Vec<CallHistoryEntry> {
        self.call_history.read().clone()
    }

    /// Clear call history.
    pub fn clear_history(&self) {
        self.call_history.write().clear();
    }

    /// Number of successful puts.
    pub fn successful_puts(&self) -> usize {
        self.count_calls("put", true)
    }

    /// Number of failed puts.
    pub fn failed_puts(&self) -> usize {
        self.count_calls("put", false)
    }

    /// Current number of stored objects.
    pub fn storage_size(&self) -> usize {
        self.storage.read().len()
    }

    /// Check if key exists in storage.
    pub fn contains_key(&self, key: &str) -> bool {
        self.storage.read().contains_key(key)
    }

    /// Stored bytes for `key`, bypassing latency and failure injection.
    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.storage.read().get(key).cloned()
    }

    /// All stored keys in order.
    pub fn keys(&self) -> Vec<String> {
        self.storage.read().keys().cloned().collect()
    }

    /// Reset storage, history and scripted failures.
    pub fn reset(&self) {
        self.storage.write().clear();
        self.call_history.write().clear();
        self.failure_queue.write().clear();
        self.end_outage();
    }

    fn count_calls(&self, operation: &str, success: bool) -> usize {
        self.call_history
            .read()
            .iter()
            .filter(|entry| entry.operation == operation && entry.success == success)
            .count()
    }

    async fn simulate_call(&self) -> StoreResult<()> {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }

        if let Some(error) = self.outage.read().clone() {
            return Err(error);
        }

        match self.failure_queue.write().pop_front() {
            Some(MockFailure::Error(error)) => Err(error),
            Some(MockFailure::Ok) | None => Ok(()),
        }
    }

    fn record_call(&self, operation: &'static str, key: &str, success: bool) {
        if self.config.track_history {
            self.call_history.write().push(CallHistoryEntry {
                operation,
                key: key.to_string(),
                success,
                timestamp: Instant::now(),
            });
        }
    }
}

impl Default for MockObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn put(&self, key: &str, data: Bytes) -> StoreResult<()> {
        if let Err(error) = self.simulate_call().await {
            self.record_call("put", key, false);
            return Err(error);
        }

        self.storage.write().insert(key.to_string(), data);
        self.record_call("put", key, true);
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Bytes> {
        if let Err(error) = self.simulate_call().await {
            self.record_call("get", key, false);
            return Err(error);
        }

        let found = self.storage.read().get(key).cloned();
        self.record_call("get", key, found.is_some());
        found.ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.simulate_call().await?;
        self.record_call("exists", key, true);
        Ok(self.storage.read().contains_key(key))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        if let Err(error) = self.simulate_call().await {
            self.record_call("delete", key, false);
            return Err(error);
        }

        self.storage.write().remove(key);
        self.record_call("delete", key, true);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<ObjectMetadata>> {
        if let Err(error) = self.simulate_call().await {
            self.record_call("list", prefix, false);
            return Err(error);
        }

        let objects = self
            .storage
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| ObjectMetadata {
                key: k.clone(),
                size_bytes: v.len() as u64,
                last_modified: Utc::now(),
            })
            .collect();
        self.record_call("list", prefix, true);
        Ok(objects)
    }
}
