//! YAML configuration for the whole recognition engine.
//!
//! All component sections are optional; omitted fields take their defaults.
//!
//! ```yaml
//! version: "1"
//! name: "reef survey"
//!
//! detector:
//!   max_side: 300
//!   sigma_factor: 0.8
//!   padding: 0.04
//!
//! embedder:
//!   kind: handcrafted        # handcrafted | onnx | stub
//!   model_path: /opt/shark_model/efficientnet_b0.onnx
//!
//! store:
//!   backend:
//!     kind: file             # in_memory | file | redb
//!     path: /app/data/embeddings/catalog.bin
//!   compression:
//!     codec: zstd
//!     level: 3
//!
//! matcher:
//!   threshold: 0.5
//!   max_results: 5
//!
//! video:
//!   frame_interval_sec: 2.0
//!   max_frames: 30
//!
//! workers:
//!   frame_workers: 4
//! ```
//!
//! After parsing, the deployment environment variables `ML_CONFIDENCE_THRESHOLD`,
//! `VIDEO_FRAME_INTERVAL`, `VIDEO_MAX_FRAMES`, `EMBEDDINGS_PATH` and
//! `MODEL_PATH` override the corresponding fields.

use std::fs;
use std::path::{Path, PathBuf};

use detect::DetectorConfig;
use embed::EmbedderConfig;
use index::{BackendConfig, StoreConfig};
use matcher::MatchConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use video::VideoConfig;

pub const ENV_THRESHOLD: &str = "ML_CONFIDENCE_THRESHOLD";
pub const ENV_FRAME_INTERVAL: &str = "VIDEO_FRAME_INTERVAL";
pub const ENV_MAX_FRAMES: &str = "VIDEO_MAX_FRAMES";
pub const ENV_EMBEDDINGS_PATH: &str = "EMBEDDINGS_PATH";
pub const ENV_MODEL_PATH: &str = "MODEL_PATH";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("invalid value {value:?} for {key}")]
    InvalidOverride { key: String, value: String },
}

/// Worker pool sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Threads used to embed and classify extracted video frames.
    pub frame_workers: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { frame_workers: 4 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharkIdConfig {
    pub version: String,
    pub name: Option<String>,
    pub detector: DetectorConfig,
    pub embedder: EmbedderConfig,
    pub store: StoreConfig,
    pub matcher: MatchConfig,
    pub video: VideoConfig,
    pub workers: WorkerConfig,
}

impl Default for SharkIdConfig {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            name: None,
            detector: DetectorConfig::default(),
            embedder: EmbedderConfig::default(),
            store: StoreConfig::default(),
            matcher: MatchConfig::default(),
            video: VideoConfig::default(),
            workers: WorkerConfig::default(),
        }
    }
}

impl SharkIdConfig {
    /// Load a YAML file, without environment overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate YAML, without environment overrides.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: SharkIdConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// File (or defaults when `path` is `None`), then process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Result<Self, ConfigLoadError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup, then re-validate.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_THRESHOLD) {
            self.matcher.threshold = parse_override(ENV_THRESHOLD, &raw)?;
        }
        if let Some(raw) = lookup(ENV_FRAME_INTERVAL) {
            self.video.frame_interval_sec = parse_override(ENV_FRAME_INTERVAL, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_FRAMES) {
            self.video.max_frames = parse_override(ENV_MAX_FRAMES, &raw)?;
        }
        if let Some(raw) = lookup(ENV_EMBEDDINGS_PATH).filter(|v| !v.trim().is_empty()) {
            self.store.backend = embeddings_backend(&self.store.backend, raw.trim());
        }
        if let Some(raw) = lookup(ENV_MODEL_PATH).filter(|v| !v.trim().is_empty()) {
            self.embedder.model_path = PathBuf::from(raw.trim());
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1" | "1.0" => {}
            v => return Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }
        self.detector.validate().map_err(section("detector"))?;
        self.embedder.validate().map_err(section("embedder"))?;
        self.store.validate().map_err(section("store"))?;
        self.matcher.validate().map_err(section("matcher"))?;
        self.video.validate().map_err(section("video"))?;
        if self.workers.frame_workers == 0 {
            return Err(ConfigLoadError::Validation(
                "workers.frame_workers must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn section<E: std::fmt::Display>(name: &'static str) -> impl Fn(E) -> ConfigLoadError {
    move |err| ConfigLoadError::Validation(format!("{name}: {err}"))
}

fn parse_override<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigLoadError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigLoadError::InvalidOverride {
            key: key.to_string(),
            value: raw.to_string(),
        })
}

/// `EMBEDDINGS_PATH` relocates a persistent backend. An in-memory catalog
/// becomes a redb database for `.redb` paths and a snapshot file otherwise.
fn embeddings_backend(current: &BackendConfig, path: &str) -> BackendConfig {
    match current {
        BackendConfig::InMemory if path.ends_with(".redb") => BackendConfig::redb(path),
        BackendConfig::InMemory => BackendConfig::file(path),
        other => other.clone().with_path(path),
    }
}
