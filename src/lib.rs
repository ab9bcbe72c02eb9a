//! Workspace umbrella crate for SharkID photo identification.
//!
//! [`Recognizer`] stitches the component crates together so a hosting
//! service handles images and videos through one entry point:
//!
//! 1. **Detect** (`detect`): find the animal and a marking zone, or fall back
//!    to a fixed crop.
//! 2. **Embed** (`embed`): turn the region into a unit-norm fingerprint.
//! 3. **Catalog** (`index`): durable, thread-safe store of fingerprints keyed
//!    by `(individual_id, photo_id)`.
//! 4. **Classify** (`matcher`): rank individuals by cosine similarity.
//! 5. **Video** (`video`): harvest frames with a detected subject.
//!
//! ```
//! use sharkid::{EmbeddingRequest, Recognizer, RegionHint, SharkIdConfig};
//! use image::{ImageFormat, Rgb, RgbImage};
//! use std::io::Cursor;
//!
//! let img = RgbImage::from_fn(160, 100, |x, y| {
//!     if (40..120).contains(&x) && (25..75).contains(&y) {
//!         Rgb([210, 200, 180])
//!     } else {
//!         Rgb([10, 70, 120])
//!     }
//! });
//! let mut png = Cursor::new(Vec::new());
//! img.write_to(&mut png, ImageFormat::Png).unwrap();
//! let bytes = png.into_inner();
//!
//! let recognizer = Recognizer::from_config(&SharkIdConfig::default()).unwrap();
//! recognizer
//!     .store_embedding(&bytes, &EmbeddingRequest::new("shark-1", "Scarback"))
//!     .unwrap();
//! let hits = recognizer.classify(&bytes, &RegionHint::default()).unwrap();
//! assert_eq!(hits[0].individual_id, "shark-1");
//! ```

mod config;
mod recognizer;

pub use config::{
    ConfigLoadError, ENV_EMBEDDINGS_PATH, ENV_FRAME_INTERVAL, ENV_MAX_FRAMES, ENV_MODEL_PATH,
    ENV_THRESHOLD, SharkIdConfig, WorkerConfig,
};
pub use recognizer::{
    EmbeddingRequest, FrameClassification, Health, Recognizer, RegionHint, StoredEmbedding,
};

pub use detect::{BoundingBox, DetectError, Detection, DetectorConfig, Orientation};
pub use embed::{EmbedError, Embedder, EmbedderConfig, EmbedderKind};
pub use index::{BackendConfig, EmbeddingRecord, EmbeddingStore, IndexError, StoreConfig};
pub use matcher::{Candidate, MatchConfig, MatchError};
pub use video::{ExtractedFrame, VideoConfig, VideoError};

use thiserror::Error;

/// Errors surfaced by [`Recognizer`] operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("request body is empty")]
    EmptyPayload,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Detect(#[from] DetectError),
    #[error("embedding failed: {0}")]
    Embed(#[from] EmbedError),
    #[error("catalog error: {0}")]
    Index(#[from] IndexError),
    #[error("classification failed: {0}")]
    Match(#[from] MatchError),
    #[error("video error: {0}")]
    Video(#[from] VideoError),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("worker pool: {0}")]
    WorkerPool(String),
}

impl PipelineError {
    /// True when the caller's input was at fault.
    pub fn is_client_error(&self) -> bool {
        match self {
            PipelineError::EmptyPayload | PipelineError::InvalidRequest(_) => true,
            PipelineError::Detect(e) => e.is_client_error(),
            PipelineError::Index(e) => e.is_client_error(),
            PipelineError::Match(e) => e.is_client_error(),
            PipelineError::Video(VideoError::Empty) => true,
            _ => false,
        }
    }

    pub fn is_empty_payload(&self) -> bool {
        matches!(
            self,
            PipelineError::EmptyPayload
                | PipelineError::Detect(DetectError::Empty)
                | PipelineError::Video(VideoError::Empty)
        )
    }

    /// The image bytes could not be decoded.
    pub fn is_unreadable_image(&self) -> bool {
        matches!(self, PipelineError::Detect(DetectError::Decode(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_error_classification() {
        assert!(PipelineError::EmptyPayload.is_client_error());
        assert!(PipelineError::from(DetectError::Decode("x".into())).is_client_error());
        assert!(PipelineError::from(DetectError::InvalidOrientation("up".into())).is_client_error());
        assert!(
            PipelineError::from(IndexError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
            .is_client_error()
        );
        assert!(!PipelineError::from(IndexError::backend("disk")).is_client_error());
        assert!(!PipelineError::Config("bad".into()).is_client_error());
    }

    #[test]
    fn unreadable_image_is_distinct_from_empty() {
        let decode = PipelineError::from(DetectError::Decode("bad magic".into()));
        assert!(decode.is_unreadable_image());
        assert!(!decode.is_empty_payload());
        let empty = PipelineError::from(DetectError::Empty);
        assert!(empty.is_empty_payload());
        assert!(!empty.is_unreadable_image());
    }
}
