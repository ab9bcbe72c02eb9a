use thiserror::Error;

/// Errors surfaced while decoding, localizing, or cropping an image.
///
/// A detection miss is never an error: [`crate::auto_detect`] returns `None`
/// and callers fall back to [`crate::fallback_crop`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DetectError {
    /// The caller supplied zero bytes.
    #[error("image payload is empty")]
    Empty,
    /// The bytes could not be decoded as any supported still-image format.
    #[error("unreadable image: {0}")]
    Decode(String),
    /// A bounding box had non-finite, negative, or out-of-range coordinates.
    #[error("invalid bounding box: {0}")]
    InvalidBox(String),
    /// Orientation tag was not one of the recognised values.
    #[error("invalid orientation: {0:?}")]
    InvalidOrientation(String),
    /// A [`crate::DetectorConfig`] failed validation.
    #[error("invalid detector config: {0}")]
    InvalidConfig(String),
}

impl DetectError {
    /// True for conditions caused by the caller's input rather than the engine.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, DetectError::InvalidConfig(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_not_client_errors() {
        assert!(DetectError::Empty.is_client_error());
        assert!(DetectError::Decode("bad magic".into()).is_client_error());
        assert!(!DetectError::InvalidConfig("x".into()).is_client_error());
    }

    #[test]
    fn decode_error_message_mentions_unreadable() {
        let err = DetectError::Decode("truncated".into());
        assert!(err.to_string().contains("unreadable image"));
        assert!(err.to_string().contains("truncated"));
    }
}
