use std::io;
use thiserror::Error;

/// Errors surfaced while building or running an embedder.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// The ONNX model file does not exist.
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    /// Configuration is inconsistent or names a backend that was not compiled in.
    #[error("invalid embedder config: {0}")]
    InvalidConfig(String),
    /// ONNX Runtime failures, or a model returning an unexpected shape.
    #[error("inference failure: {0}")]
    Inference(String),
    /// The region handed to the embedder has no pixels.
    #[error("region is empty")]
    EmptyRegion,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(feature = "onnx")]
impl From<ort::Error> for EmbedError {
    fn from(err: ort::Error) -> Self {
        EmbedError::Inference(err.to_string())
    }
}
