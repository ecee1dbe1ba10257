//! Storage metrics snapshot and Prometheus export

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;

/// Storage backend metrics
#[derive(Debug, Clone, Default, Serialize)]
pub struct StorageMetrics {
    /// Inserts acknowledged (index + WAL)
    pub inserts: u64,
    /// Inserts rejected by validation or the index
    pub rejected_inserts: u64,
    /// Inserts accepted by the index whose WAL append failed
    pub durability_failures: u64,

    /// Uploads completed
    pub uploads: u64,
    /// Failed upload attempts
    pub upload_failures: u64,
    /// Uploads that succeeded after at least one failed attempt
    pub retries: u64,
    /// Attempts postponed because the circuit breaker was open
    pub breaker_deferrals: u64,
    /// Uploads dead-lettered
    pub permanent_failures: u64,

    /// Current DLQ size
    pub dlq_size: usize,
    /// DLQ entries evicted by the size bound
    pub dlq_evictions: u64,
    /// DLQ entries removed by TTL
    pub dlq_expired: u64,
    /// Successful DLQ persists
    pub dlq_persists: u64,

    /// WAL entries awaiting upload
    pub wal_pending: usize,
    /// WAL entries uploaded but not yet compacted
    pub wal_uploaded: usize,
    /// WAL entries dead-lettered but not yet compacted
    pub wal_dead_lettered: usize,
    /// Number of compactions performed
    pub compactions: u64,
    /// Last compaction timestamp
    pub last_compaction_at: Option<DateTime<Utc>>,

    /// Serialized bytes of uploaded documents
    pub bytes_uploaded_raw: u64,
    /// Bytes actually sent after compression
    pub bytes_uploaded_stored: u64,

    /// Circuit breaker state (0=closed, 1=open, 2=half-open)
    pub circuit_breaker_state: u8,
    /// Circuit breaker error rate (0.0-1.0)
    pub circuit_breaker_error_rate: f64,

    /// Approximate memory held by indexed vectors
    pub memory_usage_bytes: u64,
}

impl StorageMetrics {
    /// raw / stored bytes over all uploads (1.0 when nothing was uploaded)
    pub fn compression_ratio(&self) -> f64 {
        if self.bytes_uploaded_stored == 0 {
            1.0
        } else {
            self.bytes_uploaded_raw as f64 / self.bytes_uploaded_stored as f64
        }
    }

    /// Exports storage metrics in Prometheus text format.
    ///
    /// Every sample carries a `collection` label.
    ///
    /// # Example
    ///
    /// ```rust
    /// use akidb_storage::StorageMetrics;
    ///
    /// let metrics = StorageMetrics::default();
    /// let output = metrics.export_prometheus("demo");
    /// assert!(output.contains("akidb_storage_uploads_total{collection=\"demo\"} 0"));
    /// ```
    pub fn export_prometheus(&self, collection: &str) -> String {
        let mut out = String::new();
        let mut metric = |name: &str, kind: &str, help: &str, value: String| {
            let _ = writeln!(out, "# HELP {name} {help}");
            let _ = writeln!(out, "# TYPE {name} {kind}");
            let _ = writeln!(out, "{name}{{collection=\"{collection}\"}} {value}");
        };

        // === Inserts ===
        metric(
            "akidb_storage_inserts_total",
            "counter",
            "Total acknowledged inserts",
            self.inserts.to_string(),
        );
        metric(
            "akidb_storage_rejected_inserts_total",
            "counter",
            "Total inserts rejected before logging",
            self.rejected_inserts.to_string(),
        );
        metric(
            "akidb_storage_durability_failures_total",
            "counter",
            "Total inserts whose WAL append failed",
            self.durability_failures.to_string(),
        );

        // === Uploads ===
        metric(
            "akidb_storage_uploads_total",
            "counter",
            "Total uploads completed",
            self.uploads.to_string(),
        );
        metric(
            "akidb_storage_upload_failures_total",
            "counter",
            "Total failed upload attempts",
            self.upload_failures.to_string(),
        );
        metric(
            "akidb_storage_retries_total",
            "counter",
            "Total uploads that succeeded after a retry",
            self.retries.to_string(),
        );
        metric(
            "akidb_storage_breaker_deferrals_total",
            "counter",
            "Total upload attempts deferred by the circuit breaker",
            self.breaker_deferrals.to_string(),
        );
        metric(
            "akidb_storage_permanent_failures_total",
            "counter",
            "Total uploads moved to the dead letter queue",
            self.permanent_failures.to_string(),
        );
        metric(
            "akidb_storage_bytes_uploaded_raw_total",
            "counter",
            "Serialized bytes uploaded before compression",
            self.bytes_uploaded_raw.to_string(),
        );
        metric(
            "akidb_storage_bytes_uploaded_stored_total",
            "counter",
            "Bytes sent to the remote store",
            self.bytes_uploaded_stored.to_string(),
        );
        metric(
            "akidb_storage_compression_ratio",
            "gauge",
            "Raw to stored upload size ratio",
            format!("{:.4}", self.compression_ratio()),
        );

        // === DLQ ===
        metric(
            "akidb_storage_dlq_size",
            "gauge",
            "Current Dead Letter Queue size",
            self.dlq_size.to_string(),
        );
        metric(
            "akidb_storage_dlq_evictions_total",
            "counter",
            "Total DLQ entries evicted by the size bound",
            self.dlq_evictions.to_string(),
        );
        metric(
            "akidb_storage_dlq_expired_total",
            "counter",
            "Total DLQ entries removed by TTL",
            self.dlq_expired.to_string(),
        );
        metric(
            "akidb_storage_dlq_persists_total",
            "counter",
            "Total DLQ persists to disk",
            self.dlq_persists.to_string(),
        );

        // === Circuit Breaker ===
        metric(
            "akidb_storage_circuit_breaker_state",
            "gauge",
            "Circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
            self.circuit_breaker_state.to_string(),
        );
        metric(
            "akidb_storage_circuit_breaker_error_rate",
            "gauge",
            "Current error rate (0.0-1.0)",
            format!("{:.4}", self.circuit_breaker_error_rate),
        );

        // === WAL ===
        metric(
            "akidb_storage_wal_pending",
            "gauge",
            "WAL entries awaiting upload",
            self.wal_pending.to_string(),
        );
        metric(
            "akidb_storage_wal_uploaded",
            "gauge",
            "WAL entries uploaded but not yet compacted",
            self.wal_uploaded.to_string(),
        );
        metric(
            "akidb_storage_wal_dead_lettered",
            "gauge",
            "WAL entries dead-lettered but not yet compacted",
            self.wal_dead_lettered.to_string(),
        );
        metric(
            "akidb_storage_compactions_total",
            "counter",
            "Total compactions performed",
            self.compactions.to_string(),
        );

        metric(
            "akidb_storage_memory_usage_bytes",
            "gauge",
            "Approximate memory held by indexed vectors",
            self.memory_usage_bytes.to_string(),
        );

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_ratio() {
        let mut metrics = StorageMetrics::default();
        assert_eq!(metrics.compression_ratio(), 1.0);

        metrics.bytes_uploaded_raw = 1000;
        metrics.bytes_uploaded_stored = 250;
        assert_eq!(metrics.compression_ratio(), 4.0);
    }

    #[test]
    fn test_prometheus_export_format() {
        let metrics = StorageMetrics {
            uploads: 42,
            dlq_size: 3,
            circuit_breaker_state: 1,
            circuit_breaker_error_rate: 0.75,
            ..Default::default()
        };

        let output = metrics.export_prometheus("c1");

        assert!(output.contains("# HELP akidb_storage_uploads_total Total uploads completed"));
        assert!(output.contains("# TYPE akidb_storage_uploads_total counter"));
        assert!(output.contains("akidb_storage_uploads_total{collection=\"c1\"} 42"));
        assert!(output.contains("akidb_storage_dlq_size{collection=\"c1\"} 3"));
        assert!(output.contains("akidb_storage_circuit_breaker_state{collection=\"c1\"} 1"));
        assert!(output.contains("akidb_storage_circuit_breaker_error_rate{collection=\"c1\"} 0.7500"));

        for line in output.lines().filter(|l| !l.starts_with('#')) {
            assert!(line.starts_with("akidb_storage_"), "bad sample line: {line}");
        }
    }
}
