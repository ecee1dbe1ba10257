//! Logging initialisation and the observability hooks the storage core calls.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::circuit_breaker::Transition;
use crate::config::{LogFormat, LoggingSettings};
use crate::dlq::DLQEntry;

const DEFAULT_FILTER: &str = "info,akidb=debug";

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `settings.level`. Fails if a global
/// subscriber is already installed, which callers may ignore.
pub fn init_tracing(settings: &LoggingSettings) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match settings.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_line_number(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()
}

/// Signals emitted by the storage core for an external metrics/alerting layer.
///
/// Every method defaults to a no-op.
pub trait StorageObserver: Send + Sync {
    /// The circuit breaker changed phase.
    fn circuit_breaker_transition(&self, _transition: &Transition) {}

    /// An entry was evicted from a full DLQ.
    fn dlq_evicted(&self, _entry: &DLQEntry) {}

    /// An expiry sweep removed `count` entries.
    fn dlq_expired(&self, _count: usize) {}
}

/// Observer that drops every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StorageObserver for NoopObserver {}

/// Observer that turns signals into structured log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl StorageObserver for TracingObserver {
    fn circuit_breaker_transition(&self, transition: &Transition) {
        tracing::info!(
            target: "akidb::telemetry",
            from = %transition.from,
            to = %transition.to,
            reason = %transition.reason,
            "circuit_breaker_transition"
        );
    }

    fn dlq_evicted(&self, entry: &DLQEntry) {
        tracing::warn!(
            target: "akidb::telemetry",
            entry_id = %entry.id,
            doc_id = %entry.document_id,
            collection_id = %entry.collection_id,
            first_failed_at = %entry.first_failed_at,
            "dlq_evicted"
        );
    }

    fn dlq_expired(&self, count: usize) {
        tracing::info!(target: "akidb::telemetry", count, "dlq_expired");
    }
}
