//! Admin surface: registry routing, health aggregation, breaker reset and DLQ operations

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use akidb_core::{CollectionId, CoreError};
use akidb_storage::{
    CircuitBreakerConfig, CircuitBreakerState, HealthStatus, StorageBackend, StorageRegistry,
};
use common::*;
use tempfile::TempDir;

#[tokio::test]
async fn test_register_rejects_duplicates() {
    let temp_dir = TempDir::new().unwrap();
    let registry = StorageRegistry::new();
    let collection_id = CollectionId::new();

    let backend = start(test_config(collection_id, &temp_dir.path().join("a")), fast_store()).await;
    registry.register(backend).await.unwrap();

    let duplicate =
        start(test_config(collection_id, &temp_dir.path().join("b")), fast_store()).await;
    assert!(matches!(
        registry.register(duplicate).await,
        Err(CoreError::AlreadyExists { .. })
    ));

    assert_eq!(registry.collection_ids().await, vec![collection_id]);
    registry.shutdown_all().await.unwrap();
}

#[tokio::test]
async fn test_insert_routes_to_collection() {
    let temp_dir = TempDir::new().unwrap();
    let registry = StorageRegistry::new();
    let a = CollectionId::new();
    let b = CollectionId::new();

    registry
        .register(start(test_config(a, &temp_dir.path().join("a")), fast_store()).await)
        .await
        .unwrap();
    registry
        .register(start(test_config(b, &temp_dir.path().join("b")), fast_store()).await)
        .await
        .unwrap();

    registry.insert(&a, doc()).await.unwrap();
    registry.insert(&a, doc()).await.unwrap();
    registry.insert(&b, doc()).await.unwrap();

    assert_eq!(registry.get(&a).await.unwrap().count().await.unwrap(), 2);
    assert_eq!(registry.get(&b).await.unwrap().count().await.unwrap(), 1);

    let err = registry.insert(&CollectionId::new(), doc()).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));

    registry.shutdown_all().await.unwrap();
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_remove_shuts_backend_down() {
    let temp_dir = TempDir::new().unwrap();
    let registry = StorageRegistry::new();
    let collection_id = CollectionId::new();

    let backend = registry
        .register(start(test_config(collection_id, temp_dir.path()), fast_store()).await)
        .await
        .unwrap();

    registry.remove(&collection_id).await.unwrap();

    assert!(backend.is_shut_down());
    assert!(registry.get(&collection_id).await.is_none());
    assert!(matches!(
        registry.remove(&collection_id).await,
        Err(CoreError::NotFound { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_health_reflects_open_breaker() {
    let temp_dir = TempDir::new().unwrap();
    let registry = StorageRegistry::new();

    let healthy_id = CollectionId::new();
    registry
        .register(start(test_config(healthy_id, &temp_dir.path().join("ok")), fast_store()).await)
        .await
        .unwrap();

    let failing_store = fast_store();
    failing_store.start_outage(unavailable());
    let failing_id = CollectionId::new();
    let config = test_config(failing_id, &temp_dir.path().join("failing"))
        .with_circuit_breaker_config(CircuitBreakerConfig {
            min_requests: 2,
            cooldown_duration: Duration::from_secs(3_600),
            ..Default::default()
        });
    registry
        .register(start(config, failing_store.clone()).await)
        .await
        .unwrap();

    assert_eq!(registry.health().await.status, HealthStatus::Healthy);

    for _ in 0..3 {
        registry.insert(&failing_id, doc()).await.unwrap();
    }
    let failing = registry.get(&failing_id).await.unwrap();
    assert!(
        eventually(Duration::from_secs(5), || async {
            failing.circuit_breaker_state() == CircuitBreakerState::Open
        })
        .await
    );

    let report = registry.health().await;
    assert_eq!(report.status, HealthStatus::Unhealthy);
    let by_id = |id: CollectionId| {
        report
            .collections
            .iter()
            .find(|c| c.collection_id == id)
            .map(|c| c.report.clone())
            .unwrap()
    };
    assert_eq!(by_id(healthy_id).status, HealthStatus::Healthy);
    assert_eq!(
        by_id(failing_id).components.storage.status,
        HealthStatus::Unhealthy
    );
    assert_eq!(by_id(failing_id).components.index.status, HealthStatus::Healthy);

    // Operator confirms recovery and resets every breaker
    failing_store.end_outage();
    let resets = registry.reset_circuit_breakers().await;
    assert_eq!(resets.len(), 2);
    let reset = resets.iter().find(|r| r.collection_id == failing_id).unwrap();
    assert_eq!(reset.previous_state, CircuitBreakerState::Open);
    assert_eq!(reset.new_state, CircuitBreakerState::Closed);

    assert!(
        eventually(Duration::from_secs(5), || async {
            failing.pending_uploads().await.is_empty()
        })
        .await
    );
    assert_eq!(registry.health().await.status, HealthStatus::Healthy);

    registry.shutdown_all().await.unwrap();
}

#[tokio::test]
async fn test_health_reports_unreachable_index() {
    let temp_dir = TempDir::new().unwrap();
    let index = Arc::new(FailingIndex::new());
    let backend = StorageBackend::new(
        test_config(CollectionId::new(), temp_dir.path()),
        index.clone(),
        fast_store(),
    )
    .await
    .unwrap();

    assert_eq!(backend.health().await.status, HealthStatus::Healthy);

    index.fail.store(true, Ordering::SeqCst);
    let report = backend.health().await;
    assert_eq!(report.status, HealthStatus::Unhealthy);
    assert_eq!(report.components.index.status, HealthStatus::Unhealthy);

    index.fail.store(false, Ordering::SeqCst);
    backend.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_list_and_retry_dlq_through_registry() {
    let temp_dir = TempDir::new().unwrap();
    let registry = StorageRegistry::new();
    let collection_id = CollectionId::new();

    let store = fast_store();
    store.start_outage(forbidden());
    registry
        .register(start(test_config(collection_id, temp_dir.path()), store).await)
        .await
        .unwrap();

    for _ in 0..3 {
        registry.insert(&collection_id, doc()).await.unwrap();
    }

    assert!(
        eventually(Duration::from_secs(5), || async {
            registry.list_dlq(&collection_id).await.unwrap().len() == 3
        })
        .await
    );
    let entries = registry.list_dlq(&collection_id).await.unwrap();
    assert!(entries
        .windows(2)
        .all(|w| w[0].first_failed_at <= w[1].first_failed_at));
    assert!(entries.iter().all(|e| e.collection_id == collection_id));

    let report = registry.retry_dlq(&collection_id).await.unwrap();
    assert_eq!((report.retried, report.succeeded, report.failed), (3, 0, 3));
    assert!(registry.list_dlq(&collection_id).await.unwrap().is_empty());

    let missing = CollectionId::new();
    assert!(matches!(
        registry.retry_dlq(&missing).await,
        Err(CoreError::NotFound { .. })
    ));
    assert!(registry.list_dlq(&missing).await.is_err());

    registry.shutdown_all().await.unwrap();
}
