//! Gzip compression for remote-tier uploads

use akidb_core::error::{CoreError, CoreResult};
use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Compression configuration
#[derive(Debug, Clone, Copy)]
pub struct CompressionConfig {
    /// Compression level (0-9, default: 6)
    pub level: u32,
    /// Enable compression (default: false)
    pub enabled: bool,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            level: 6,
            enabled: false,
        }
    }
}

impl CompressionConfig {
    /// Gzip at the default level.
    #[must_use]
    pub fn gzip() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.level > 9 {
            return Err(CoreError::ValidationError(format!(
                "invalid compression level: {} (max: 9)",
                self.level
            )));
        }
        Ok(())
    }

    /// Convert compression level to flate2::Compression
    pub fn compression_level(&self) -> Compression {
        match self.level {
            0 => Compression::none(),
            1 => Compression::fast(),
            6 => Compression::default(),
            9 => Compression::best(),
            n => Compression::new(n),
        }
    }
}

/// Payload ready for upload, with its size before and after encoding.
#[derive(Debug, Clone)]
pub struct EncodedPayload {
    /// Bytes to send.
    pub bytes: Bytes,
    /// Size before compression.
    pub original_size: usize,
    /// Whether `bytes` is gzip.
    pub compressed: bool,
}

impl EncodedPayload {
    /// Size on the wire.
    #[must_use]
    pub fn stored_size(&self) -> usize {
        self.bytes.len()
    }

    /// original / stored; 1.0 for an empty payload.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        if self.bytes.is_empty() {
            return 1.0;
        }
        self.original_size as f64 / self.bytes.len() as f64
    }
}

/// Compress `data` when enabled, otherwise pass it through.
pub fn encode(data: Vec<u8>, config: CompressionConfig) -> CoreResult<EncodedPayload> {
    let original_size = data.len();
    if !config.enabled {
        return Ok(EncodedPayload {
            bytes: Bytes::from(data),
            original_size,
            compressed: false,
        });
    }

    Ok(EncodedPayload {
        bytes: compress(&data, config)?,
        original_size,
        compressed: true,
    })
}

/// Compress bytes with gzip
pub fn compress(data: &[u8], config: CompressionConfig) -> CoreResult<Bytes> {
    let mut encoder = GzEncoder::new(Vec::new(), config.compression_level());
    encoder
        .write_all(data)
        .map_err(|e| CoreError::SerializationError(format!("Gzip compression failed: {}", e)))?;

    let compressed = encoder
        .finish()
        .map_err(|e| CoreError::SerializationError(format!("Gzip finish failed: {}", e)))?;

    Ok(Bytes::from(compressed))
}

/// Decompress gzip bytes
pub fn decompress(data: &[u8]) -> CoreResult<Bytes> {
    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::new();

    decoder.read_to_end(&mut decompressed).map_err(|e| {
        CoreError::DeserializationError(format!("Gzip decompression failed: {}", e))
    })?;

    Ok(Bytes::from(decompressed))
}

/// Whether `data` starts with the gzip magic bytes.
#[must_use]
pub fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[..2] == GZIP_MAGIC
}

/// Decompress gzip payloads, pass anything else through.
pub fn decode(data: Bytes) -> CoreResult<Bytes> {
    if is_gzip(&data) {
        decompress(&data)
    } else {
        Ok(data)
    }
}
