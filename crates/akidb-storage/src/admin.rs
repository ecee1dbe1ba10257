//! Operational surface: health reports, admin reports and the per-collection registry.
//!
//! The transport that exposes these (HTTP, gRPC) lives outside this crate;
//! everything here is plain data plus the [`StorageRegistry`] that routes
//! admin calls to the right collection.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use akidb_core::{CollectionId, CoreError, CoreResult, VectorDocument};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::circuit_breaker::CircuitBreakerState;
use crate::dlq::DLQEntry;
use crate::storage_backend::StorageBackend;
use crate::wal::LogSequenceNumber;

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// The more severe of the two.
    #[must_use]
    pub fn worst(self, other: Self) -> Self {
        self.max(other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    pub message: String,
}

impl ComponentHealth {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            message: message.into(),
        }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            message: message.into(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthComponents {
    pub index: ComponentHealth,
    pub storage: ComponentHealth,
    pub memory: ComponentHealth,
}

/// Health of one collection's backend.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Worst of the component statuses
    pub status: HealthStatus,
    pub uptime_seconds: u64,
    pub components: HealthComponents,
}

/// Health across every registered collection.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryHealthReport {
    pub status: HealthStatus,
    pub collections: Vec<CollectionHealth>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionHealth {
    pub collection_id: CollectionId,
    #[serde(flatten)]
    pub report: HealthReport,
}

// ============================================================================
// Admin reports
// ============================================================================

/// Result of a DLQ "retry", which clears the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DlqRetryReport {
    pub collection_id: CollectionId,
    pub retried: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitBreakerResetReport {
    pub collection_id: CollectionId,
    pub previous_state: CircuitBreakerState,
    pub new_state: CircuitBreakerState,
}

// ============================================================================
// Registry
// ============================================================================

/// Storage backends keyed by collection.
///
/// Inserts routed through the registry hold the map's read lock for their
/// whole duration, so [`remove`](Self::remove) waits for in-flight inserts
/// before it shuts the backend down.
#[derive(Default)]
pub struct StorageRegistry {
    backends: RwLock<HashMap<CollectionId, Arc<StorageBackend>>>,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under its own collection id.
    pub async fn register(&self, backend: StorageBackend) -> CoreResult<Arc<StorageBackend>> {
        let collection_id = backend.collection_id();
        let mut backends = self.backends.write().await;
        if backends.contains_key(&collection_id) {
            return Err(CoreError::already_exists(
                "storage backend",
                collection_id.to_string(),
            ));
        }

        let backend = Arc::new(backend);
        backends.insert(collection_id, backend.clone());
        tracing::info!(collection_id = %collection_id, "storage backend registered");
        Ok(backend)
    }

    pub async fn get(&self, collection_id: &CollectionId) -> Option<Arc<StorageBackend>> {
        self.backends.read().await.get(collection_id).cloned()
    }

    pub async fn collection_ids(&self) -> Vec<CollectionId> {
        let mut ids: Vec<_> = self.backends.read().await.keys().copied().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.backends.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.backends.read().await.is_empty()
    }

    /// Insert into a collection.
    pub async fn insert(
        &self,
        collection_id: &CollectionId,
        doc: VectorDocument,
    ) -> CoreResult<LogSequenceNumber> {
        let backends = self.backends.read().await;
        let backend = backends
            .get(collection_id)
            .ok_or_else(|| CoreError::not_found("collection", collection_id.to_string()))?;
        backend.insert(doc).await
    }

    /// Unregister a collection and shut its backend down.
    pub async fn remove(&self, collection_id: &CollectionId) -> CoreResult<()> {
        let backend = {
            let mut backends = self.backends.write().await;
            backends
                .remove(collection_id)
                .ok_or_else(|| CoreError::not_found("collection", collection_id.to_string()))?
        };

        backend.shutdown().await?;
        tracing::info!(collection_id = %collection_id, "storage backend removed");
        Ok(())
    }

    /// Health of every collection; overall status is the worst of them.
    pub async fn health(&self) -> RegistryHealthReport {
        let backends = self.snapshot().await;

        let mut status = HealthStatus::Healthy;
        let mut collections = Vec::with_capacity(backends.len());
        for backend in backends {
            let report = backend.health().await;
            status = status.worst(report.status);
            collections.push(CollectionHealth {
                collection_id: backend.collection_id(),
                report,
            });
        }

        RegistryHealthReport {
            status,
            collections,
        }
    }

    /// Force every collection's circuit breaker closed.
    pub async fn reset_circuit_breakers(&self) -> Vec<CircuitBreakerResetReport> {
        self.snapshot()
            .await
            .iter()
            .map(|backend| backend.reset_circuit_breaker())
            .collect()
    }

    pub async fn retry_dlq(&self, collection_id: &CollectionId) -> CoreResult<DlqRetryReport> {
        let backend = self.require(collection_id).await?;
        Ok(backend.retry_dlq().await)
    }

    pub async fn list_dlq(&self, collection_id: &CollectionId) -> CoreResult<Vec<DLQEntry>> {
        let backend = self.require(collection_id).await?;
        Ok(backend.dead_letter_entries())
    }

    /// Shut down and unregister every backend. Returns the first shutdown error.
    pub async fn shutdown_all(&self) -> CoreResult<()> {
        let backends: Vec<_> = self.backends.write().await.drain().collect();

        let mut first_error = None;
        for (collection_id, backend) in backends {
            if let Err(e) = backend.shutdown().await {
                tracing::error!(collection_id = %collection_id, error = %e, "backend shutdown failed");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn require(&self, collection_id: &CollectionId) -> CoreResult<Arc<StorageBackend>> {
        self.get(collection_id)
            .await
            .ok_or_else(|| CoreError::not_found("collection", collection_id.to_string()))
    }

    async fn snapshot(&self) -> Vec<Arc<StorageBackend>> {
        let backends = self.backends.read().await;
        let mut list: Vec<_> = backends.values().cloned().collect();
        list.sort_by_key(|backend| backend.collection_id());
        list
    }
}
