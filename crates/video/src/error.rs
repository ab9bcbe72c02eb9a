use thiserror::Error;

/// Failures while opening or decoding a video.
///
/// [`crate::extract_subject_frames`] never returns these; they surface
/// through [`crate::try_extract_subject_frames`] and in logs.
#[derive(Debug, Error)]
pub enum VideoError {
    #[error("video payload is empty")]
    Empty,
    #[error("failed to decode video: {0}")]
    Decode(String),
    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },
    #[error("failed to encode frame: {0}")]
    Encode(String),
    #[error("invalid video config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl VideoError {
    pub(crate) fn tool(tool: &str, message: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.to_string(),
            message: message.into(),
        }
    }
}

impl From<image::ImageError> for VideoError {
    fn from(e: image::ImageError) -> Self {
        VideoError::Decode(e.to_string())
    }
}
