//! Storage configuration.
//!
//! [`StorageConfig`] is the typed runtime configuration a backend is built
//! from. [`StorageSettings`] is its file/env counterpart, with precedence:
//! 1. Environment variables (highest priority)
//! 2. TOML configuration file
//! 3. Default values (lowest priority)

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use akidb_core::{CollectionId, CoreError, CoreResult};
use serde::{Deserialize, Serialize};

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::compression::CompressionConfig;
use crate::dlq::DLQConfig;
use crate::retry::RetryConfig;
use crate::upload_scheduler::UploadConfig;
use crate::wal::FileWALConfig;

/// Env var naming the settings file.
pub const CONFIG_PATH_ENV: &str = "AKIDB_STORAGE_CONFIG";

/// Settings file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "akidb-storage.toml";

/// Compaction trigger configuration
#[derive(Debug, Clone)]
pub struct CompactionConfig {
    /// Periodic check interval (default: 300s)
    pub interval: Duration,
    /// Uploaded or dead-lettered entries that trigger an early compaction (default: 1,000)
    pub min_uploaded_entries: usize,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            min_uploaded_entries: 1_000,
        }
    }
}

/// Runtime configuration for one collection's storage backend.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub collection_id: CollectionId,
    /// Vector dimension every inserted document must have
    pub dimension: usize,
    /// Root for the WAL (`wal/`) and the persisted DLQ (`dlq.json`)
    pub data_dir: PathBuf,
    pub wal: FileWALConfig,
    pub upload: UploadConfig,
    pub retry: RetryConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub dlq: DLQConfig,
    pub compaction: CompactionConfig,
    /// Bound on waiting for workers during shutdown (default: 30s)
    pub shutdown_timeout: Duration,
    /// Memory budget for health reporting; `None` disables the check
    pub memory_limit_bytes: Option<u64>,
    /// Pull compacted documents back from the remote store on startup (default: true)
    pub hydrate_from_remote: bool,
}

impl StorageConfig {
    /// Defaults for `collection_id`, storing state under `data_dir`.
    pub fn new(collection_id: CollectionId, dimension: usize, data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let dlq = DLQConfig {
            persistence_path: Some(data_dir.join("dlq.json")),
            ..DLQConfig::default()
        };

        Self {
            collection_id,
            dimension,
            data_dir,
            wal: FileWALConfig::default(),
            upload: UploadConfig::default(),
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            dlq,
            compaction: CompactionConfig::default(),
            shutdown_timeout: Duration::from_secs(30),
            memory_limit_bytes: None,
            hydrate_from_remote: true,
        }
    }

    /// Directory holding WAL segments.
    pub fn wal_dir(&self) -> PathBuf {
        self.data_dir.join("wal")
    }

    #[must_use]
    pub fn with_wal_config(mut self, wal: FileWALConfig) -> Self {
        self.wal = wal;
        self
    }

    #[must_use]
    pub fn with_upload_config(mut self, upload: UploadConfig) -> Self {
        self.upload = upload;
        self
    }

    #[must_use]
    pub fn with_compression(mut self, compression: CompressionConfig) -> Self {
        self.upload.compression = compression;
        self
    }

    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_circuit_breaker_config(mut self, circuit_breaker: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    /// Replace the DLQ configuration. A `None` persistence path keeps the queue in memory only.
    #[must_use]
    pub fn with_dlq_config(mut self, dlq: DLQConfig) -> Self {
        self.dlq = dlq;
        self
    }

    #[must_use]
    pub fn with_compaction_config(mut self, compaction: CompactionConfig) -> Self {
        self.compaction = compaction;
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_memory_limit(mut self, bytes: u64) -> Self {
        self.memory_limit_bytes = Some(bytes);
        self
    }

    #[must_use]
    pub fn with_hydrate_from_remote(mut self, enabled: bool) -> Self {
        self.hydrate_from_remote = enabled;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.dimension == 0 {
            return Err(CoreError::ValidationError(
                "dimension must be > 0".to_string(),
            ));
        }
        if self.shutdown_timeout.is_zero() {
            return Err(CoreError::ValidationError(
                "shutdown_timeout must be > 0".to_string(),
            ));
        }
        if self.compaction.interval.is_zero() || self.compaction.min_uploaded_entries == 0 {
            return Err(CoreError::ValidationError(
                "compaction interval and threshold must be > 0".to_string(),
            ));
        }
        if self.memory_limit_bytes == Some(0) {
            return Err(CoreError::ValidationError(
                "memory_limit_bytes must be > 0 when set".to_string(),
            ));
        }

        self.wal.validate()?;
        self.upload.validate()?;
        self.retry.validate()?;
        self.circuit_breaker.validate()?;
        self.dlq.validate()
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format `{other}`")),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive, e.g. "info" or "info,akidb=debug" (default: "info")
    pub level: String,
    /// Log format: json or pretty (default: pretty)
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: f64,
    pub window_seconds: u64,
    pub cooldown_seconds: u64,
    pub half_open_successes: u32,
    pub min_requests: usize,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 0.5,
            window_seconds: 60,
            cooldown_seconds: 300,
            half_open_successes: 10,
            min_requests: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DlqSettings {
    pub max_size: usize,
    pub ttl_seconds: i64,
    pub cleanup_interval_seconds: u64,
    pub flush_interval_seconds: u64,
    /// Persist the queue under `data_dir` (default: true)
    pub persist: bool,
}

impl Default for DlqSettings {
    fn default() -> Self {
        Self {
            max_size: 1_000,
            ttl_seconds: 604_800,
            cleanup_interval_seconds: 3_600,
            flush_interval_seconds: 60,
            persist: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    pub batch_size: usize,
    pub max_concurrency: usize,
    /// gzip each document before upload (default: false)
    pub compression: bool,
    pub compression_level: u32,
    pub key_prefix: String,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_concurrency: 5,
            compression: false,
            compression_level: 6,
            key_prefix: "vectors".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub breaker_defer_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            base_backoff_ms: 1_000,
            max_backoff_ms: 64_000,
            breaker_defer_ms: 10_000,
            poll_interval_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionSettings {
    pub interval_seconds: u64,
    pub min_uploaded_entries: usize,
}

impl Default for CompactionSettings {
    fn default() -> Self {
        Self {
            interval_seconds: 300,
            min_uploaded_entries: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalSettings {
    pub max_file_size_bytes: u64,
    pub sync_on_write: bool,
    pub retention_count: usize,
}

impl Default for WalSettings {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 100 * 1024 * 1024,
            sync_on_write: true,
            retention_count: 10,
        }
    }
}

/// File/env form of the storage configuration.
///
/// Every section is optional in TOML; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Root data directory (default: "./data")
    pub data_dir: PathBuf,
    pub shutdown_timeout_seconds: u64,
    pub memory_limit_bytes: Option<u64>,
    pub hydrate_from_remote: bool,
    pub circuit_breaker: CircuitBreakerSettings,
    pub dlq: DlqSettings,
    pub upload: UploadSettings,
    pub retry: RetrySettings,
    pub compaction: CompactionSettings,
    pub wal: WalSettings,
    pub logging: LoggingSettings,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            shutdown_timeout_seconds: 30,
            memory_limit_bytes: None,
            hydrate_from_remote: true,
            circuit_breaker: CircuitBreakerSettings::default(),
            dlq: DlqSettings::default(),
            upload: UploadSettings::default(),
            retry: RetrySettings::default(),
            compaction: CompactionSettings::default(),
            wal: WalSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl StorageSettings {
    /// Load settings from a TOML file.
    ///
    /// Returns an error if the file doesn't exist or has invalid TOML syntax.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::TomlError { path, source: e })
    }

    /// Parse settings from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::TomlError {
            path: PathBuf::from("<inline>"),
            source: e,
        })
    }

    /// Load settings with environment variable overrides.
    ///
    /// Reads the file named by `AKIDB_STORAGE_CONFIG`, else `akidb-storage.toml`
    /// if it exists, else starts from defaults. Then applies env overrides and validates.
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            Err(_) => Self::default(),
        };

        settings.apply_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`.
    ///
    /// Supported keys:
    /// - `AKIDB_DATA_DIR`
    /// - `AKIDB_CB_FAILURE_THRESHOLD`, `AKIDB_CB_WINDOW_SECONDS`,
    ///   `AKIDB_CB_COOLDOWN_SECONDS`, `AKIDB_CB_HALF_OPEN_SUCCESSES`
    /// - `AKIDB_DLQ_MAX_SIZE`, `AKIDB_DLQ_TTL_SECONDS`, `AKIDB_DLQ_FLUSH_INTERVAL_SECONDS`
    /// - `AKIDB_UPLOAD_BATCH_SIZE`, `AKIDB_UPLOAD_MAX_CONCURRENCY`, `AKIDB_UPLOAD_COMPRESSION`
    /// - `AKIDB_MAX_ATTEMPTS`
    /// - `AKIDB_LOG_LEVEL`, `AKIDB_LOG_FORMAT`
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("AKIDB_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Some(v) = parse_override(&lookup, "AKIDB_CB_FAILURE_THRESHOLD") {
            self.circuit_breaker.failure_threshold = v;
        }
        if let Some(v) = parse_override(&lookup, "AKIDB_CB_WINDOW_SECONDS") {
            self.circuit_breaker.window_seconds = v;
        }
        if let Some(v) = parse_override(&lookup, "AKIDB_CB_COOLDOWN_SECONDS") {
            self.circuit_breaker.cooldown_seconds = v;
        }
        if let Some(v) = parse_override(&lookup, "AKIDB_CB_HALF_OPEN_SUCCESSES") {
            self.circuit_breaker.half_open_successes = v;
        }

        if let Some(v) = parse_override(&lookup, "AKIDB_DLQ_MAX_SIZE") {
            self.dlq.max_size = v;
        }
        if let Some(v) = parse_override(&lookup, "AKIDB_DLQ_TTL_SECONDS") {
            self.dlq.ttl_seconds = v;
        }
        if let Some(v) = parse_override(&lookup, "AKIDB_DLQ_FLUSH_INTERVAL_SECONDS") {
            self.dlq.flush_interval_seconds = v;
        }

        if let Some(v) = parse_override(&lookup, "AKIDB_UPLOAD_BATCH_SIZE") {
            self.upload.batch_size = v;
        }
        if let Some(v) = parse_override(&lookup, "AKIDB_UPLOAD_MAX_CONCURRENCY") {
            self.upload.max_concurrency = v;
        }
        if let Some(raw) = lookup("AKIDB_UPLOAD_COMPRESSION") {
            match parse_flag(&raw) {
                Some(enabled) => self.upload.compression = enabled,
                None => tracing::warn!(
                    key = "AKIDB_UPLOAD_COMPRESSION",
                    value = %raw,
                    "ignoring unparseable override"
                ),
            }
        }

        if let Some(v) = parse_override(&lookup, "AKIDB_MAX_ATTEMPTS") {
            self.retry.max_attempts = v;
        }

        if let Some(level) = lookup("AKIDB_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(v) = parse_override(&lookup, "AKIDB_LOG_FORMAT") {
            self.logging.format = v;
        }
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if tracing_subscriber::EnvFilter::try_new(&self.logging.level).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "logging.level `{}` is not a valid filter directive",
                self.logging.level
            )));
        }

        self.to_storage_config(CollectionId::new(), 1)
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Build the runtime configuration for one collection.
    pub fn to_storage_config(&self, collection_id: CollectionId, dimension: usize) -> StorageConfig {
        let cb = &self.circuit_breaker;
        let dlq = &self.dlq;
        let upload = &self.upload;
        let retry = &self.retry;

        let mut config = StorageConfig::new(collection_id, dimension, self.data_dir.clone())
            .with_circuit_breaker_config(CircuitBreakerConfig {
                failure_threshold: cb.failure_threshold,
                window_duration: Duration::from_secs(cb.window_seconds),
                cooldown_duration: Duration::from_secs(cb.cooldown_seconds),
                half_open_successes: cb.half_open_successes,
                min_requests: cb.min_requests,
            })
            .with_upload_config(UploadConfig {
                batch_size: upload.batch_size,
                max_concurrency: upload.max_concurrency,
                compression: CompressionConfig {
                    level: upload.compression_level,
                    enabled: upload.compression,
                },
                key_prefix: upload.key_prefix.clone(),
            })
            .with_retry_config(RetryConfig {
                max_attempts: retry.max_attempts,
                base_backoff: Duration::from_millis(retry.base_backoff_ms),
                max_backoff: Duration::from_millis(retry.max_backoff_ms),
                breaker_defer: Duration::from_millis(retry.breaker_defer_ms),
                poll_interval: Duration::from_millis(retry.poll_interval_ms),
            })
            .with_compaction_config(CompactionConfig {
                interval: Duration::from_secs(self.compaction.interval_seconds),
                min_uploaded_entries: self.compaction.min_uploaded_entries,
            })
            .with_wal_config(FileWALConfig {
                max_file_size_bytes: self.wal.max_file_size_bytes,
                sync_on_write: self.wal.sync_on_write,
                retention_count: self.wal.retention_count,
            })
            .with_shutdown_timeout(Duration::from_secs(self.shutdown_timeout_seconds))
            .with_hydrate_from_remote(self.hydrate_from_remote);

        let persistence_path = config.dlq.persistence_path.take().filter(|_| dlq.persist);
        config = config.with_dlq_config(DLQConfig {
            max_size: dlq.max_size,
            ttl_seconds: dlq.ttl_seconds,
            persistence_path,
            cleanup_interval_seconds: dlq.cleanup_interval_seconds,
            flush_interval_seconds: dlq.flush_interval_seconds,
        });
        config.memory_limit_bytes = self.memory_limit_bytes;
        config
    }
}

fn parse_override<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable override");
            None
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "gzip" => Some(true),
        "false" | "0" | "no" | "off" | "none" => Some(false),
        _ => None,
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading configuration file
    #[error("Failed to read config file {path:?}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// TOML parsing error
    #[error("Failed to parse TOML in {path:?}: {source}")]
    TomlError {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Validation error
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_settings_match_runtime_defaults() {
        let settings = StorageSettings::default();
        assert!(settings.validate().is_ok());

        let config = settings.to_storage_config(CollectionId::new(), 128);
        assert_eq!(config.circuit_breaker.failure_threshold, 0.5);
        assert_eq!(config.circuit_breaker.window_duration, Duration::from_secs(60));
        assert_eq!(config.circuit_breaker.cooldown_duration, Duration::from_secs(300));
        assert_eq!(config.circuit_breaker.half_open_successes, 10);
        assert_eq!(config.dlq.max_size, 1_000);
        assert_eq!(config.dlq.ttl_seconds, 604_800);
        assert_eq!(config.dlq.flush_interval_seconds, 60);
        assert_eq!(
            config.dlq.persistence_path,
            Some(PathBuf::from("./data").join("dlq.json"))
        );
        assert_eq!(config.upload.batch_size, 10);
        assert_eq!(config.upload.max_concurrency, 5);
        assert!(!config.upload.compression.enabled);
        assert_eq!(config.retry.max_attempts, 15);
        assert_eq!(config.wal_dir(), PathBuf::from("./data").join("wal"));
        assert!(config.hydrate_from_remote);
    }

    #[test]
    fn test_toml_partial_sections() {
        let settings = StorageSettings::from_toml_str(
            r#"
            data_dir = "/var/lib/akidb"

            [circuit_breaker]
            failure_threshold = 0.25

            [dlq]
            max_size = 50
            persist = false

            [upload]
            compression = true

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(settings.data_dir, PathBuf::from("/var/lib/akidb"));
        assert_eq!(settings.circuit_breaker.failure_threshold, 0.25);
        assert_eq!(settings.circuit_breaker.window_seconds, 60);
        assert_eq!(settings.logging.format, LogFormat::Json);

        let config = settings.to_storage_config(CollectionId::new(), 4);
        assert_eq!(config.dlq.max_size, 50);
        assert!(config.dlq.persistence_path.is_none());
        assert!(config.upload.compression.enabled);
    }

    #[test]
    fn test_invalid_toml_reports_error() {
        let err = StorageSettings::from_toml_str("[dlq\nmax_size = ").unwrap_err();
        assert!(matches!(err, ConfigError::TomlError { .. }));
    }

    #[test]
    fn test_from_file_missing() {
        let err = StorageSettings::from_file("/nonexistent/akidb-storage.toml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError { .. }));
    }

    #[test]
    fn test_overrides_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("AKIDB_DATA_DIR", "/tmp/akidb"),
            ("AKIDB_CB_FAILURE_THRESHOLD", "0.8"),
            ("AKIDB_CB_COOLDOWN_SECONDS", "30"),
            ("AKIDB_DLQ_MAX_SIZE", "250"),
            ("AKIDB_UPLOAD_COMPRESSION", "gzip"),
            ("AKIDB_MAX_ATTEMPTS", "7"),
            ("AKIDB_LOG_FORMAT", "json"),
            ("AKIDB_UPLOAD_BATCH_SIZE", "lots"),
        ]
        .into_iter()
        .collect();

        let mut settings = StorageSettings::default();
        settings.apply_overrides_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(settings.data_dir, PathBuf::from("/tmp/akidb"));
        assert_eq!(settings.circuit_breaker.failure_threshold, 0.8);
        assert_eq!(settings.circuit_breaker.cooldown_seconds, 30);
        assert_eq!(settings.dlq.max_size, 250);
        assert!(settings.upload.compression);
        assert_eq!(settings.retry.max_attempts, 7);
        assert_eq!(settings.logging.format, LogFormat::Json);
        // Unparseable values leave the default in place.
        assert_eq!(settings.upload.batch_size, 10);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut settings = StorageSettings::default();
        settings.circuit_breaker.failure_threshold = 1.5;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let mut settings = StorageSettings::default();
        settings.dlq.max_size = 0;
        assert!(settings.validate().is_err());

        let config = StorageConfig::new(CollectionId::new(), 0, "/tmp");
        assert!(config.validate().is_err());
    }
}
