use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{EmbedError, Embedder, HandcraftedEmbedder, StubEmbedder};

/// Which [`Embedder`] implementation to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    #[default]
    Handcrafted,
    Onnx,
    Stub,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    pub kind: EmbedderKind,
    /// Side of the square working copy for the hand-crafted descriptor.
    pub input_size: u32,
    /// ONNX model file, read when `kind` is `onnx`.
    pub model_path: PathBuf,
    /// Intra-op threads for the ONNX session.
    pub intra_threads: usize,
    /// Output dimension of the stub backend.
    pub stub_dimension: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            kind: EmbedderKind::Handcrafted,
            input_size: 128,
            model_path: PathBuf::from("/opt/shark_model/efficientnet_b0.onnx"),
            intra_threads: 2,
            stub_dimension: 64,
        }
    }
}

impl EmbedderConfig {
    pub fn with_kind(mut self, kind: EmbedderKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn validate(&self) -> Result<(), EmbedError> {
        if self.input_size == 0 {
            return Err(EmbedError::InvalidConfig("input_size must be > 0".into()));
        }
        if self.kind == EmbedderKind::Stub && self.stub_dimension == 0 {
            return Err(EmbedError::InvalidConfig(
                "stub_dimension must be > 0".into(),
            ));
        }
        if self.kind == EmbedderKind::Onnx && self.model_path.as_os_str().is_empty() {
            return Err(EmbedError::InvalidConfig("model_path is required".into()));
        }
        Ok(())
    }
}

/// Construct the embedder selected by `cfg`.
pub fn build_embedder(cfg: &EmbedderConfig) -> Result<Arc<dyn Embedder>, EmbedError> {
    cfg.validate()?;
    let embedder: Arc<dyn Embedder> = match cfg.kind {
        EmbedderKind::Handcrafted => Arc::new(HandcraftedEmbedder::new(cfg.input_size)),
        EmbedderKind::Stub => Arc::new(StubEmbedder::new(cfg.stub_dimension)),
        EmbedderKind::Onnx => build_onnx(cfg)?,
    };
    tracing::info!(
        embedder = embedder.name(),
        dimension = embedder.dimension(),
        "embedder ready"
    );
    Ok(embedder)
}

#[cfg(feature = "onnx")]
fn build_onnx(cfg: &EmbedderConfig) -> Result<Arc<dyn Embedder>, EmbedError> {
    Ok(Arc::new(crate::OnnxEmbedder::load(
        &cfg.model_path,
        cfg.intra_threads,
    )?))
}

#[cfg(not(feature = "onnx"))]
fn build_onnx(_cfg: &EmbedderConfig) -> Result<Arc<dyn Embedder>, EmbedError> {
    Err(EmbedError::InvalidConfig(
        "onnx backend requested but the `onnx` feature is disabled".into(),
    ))
}
