//! # SharkID Index
//!
//! The catalog of known individuals: a durable, thread-safe collection of
//! unit-norm region embeddings keyed by `(individual_id, photo_id)`.
//!
//! ## Core Features
//!
//! - **Write-through persistence**: every [`EmbeddingStore::upsert`] saves the
//!   whole catalog before returning.
//! - **Pluggable backends** behind [`StoreBackend`]: in-memory, a single
//!   atomically replaced file, or redb (feature `backend-redb`).
//! - **Load gate**: a snapshot that fails to decode, has inconsistent row
//!   counts, or was written for a different embedding width is discarded as a
//!   whole and the store starts empty.
//!
//! ## Example Usage
//!
//! ```
//! use index::{EmbeddingRecord, EmbeddingStore, StoreConfig};
//!
//! let store = EmbeddingStore::open(&StoreConfig::default(), 3).unwrap();
//! store
//!     .upsert(EmbeddingRecord::new("shark-1", "Scarback", vec![0.0, 0.6, 0.8]).with_photo_id("p-1"))
//!     .unwrap();
//! assert_eq!(store.count(), 1);
//! ```

mod backend;
mod record;
mod snapshot;
mod store;

#[cfg(feature = "backend-redb")]
pub use backend::RedbBackend;
pub use backend::{BackendConfig, FileBackend, InMemoryBackend, StoreBackend};
pub use record::EmbeddingRecord;
pub use snapshot::SNAPSHOT_SCHEMA_VERSION;
pub use store::EmbeddingStore;

use bincode::error::{DecodeError, EncodeError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zstd::{decode_all, encode_all};

/// Compression codec options for persisted snapshots.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionCodec {
    None,
    #[default]
    Zstd,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    pub codec: CompressionCodec,
    /// Zstd level, 1-22.
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::default(),
            level: 3,
        }
    }
}

impl CompressionConfig {
    pub fn none() -> Self {
        Self {
            codec: CompressionCodec::None,
            ..Self::default()
        }
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(encode_all(data, self.level)?),
        }
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(decode_all(data)?),
        }
    }
}

/// Config for opening an [`EmbeddingStore`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: BackendConfig,
    pub compression: CompressionConfig,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_compression(mut self, compression: CompressionConfig) -> Self {
        self.compression = compression;
        self
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        if self.compression.codec == CompressionCodec::Zstd
            && !(1..=22).contains(&self.compression.level)
        {
            return Err(IndexError::InvalidConfig(format!(
                "zstd level {} outside 1..=22",
                self.compression.level
            )));
        }
        match &self.backend {
            BackendConfig::File { path } | BackendConfig::Redb { path }
                if path.as_os_str().is_empty() =>
            {
                Err(IndexError::InvalidConfig("backend path is empty".into()))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization encode error: {0}")]
    Encode(String),
    #[error("serialization decode error: {0}")]
    Decode(String),
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    #[error("invalid store config: {0}")]
    InvalidConfig(String),
}

impl From<EncodeError> for IndexError {
    fn from(e: EncodeError) -> Self {
        IndexError::Encode(e.to_string())
    }
}

impl From<DecodeError> for IndexError {
    fn from(e: DecodeError) -> Self {
        IndexError::Decode(e.to_string())
    }
}

impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Io(e.to_string())
    }
}

impl IndexError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }

    /// True when the caller's record was at fault rather than storage.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            IndexError::DimensionMismatch { .. } | IndexError::InvalidRecord(_)
        )
    }
}
