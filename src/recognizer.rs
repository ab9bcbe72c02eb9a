use std::sync::Arc;
use std::time::Instant;

use detect::{
    BoundingBox, Detection, DetectorConfig, Orientation, Region, RegionSource, crop_zone,
    decode_image, select_region,
};
use embed::{Embedder, build_embedder};
use index::{EmbeddingRecord, EmbeddingStore};
use matcher::{Candidate, MatchConfig, Matcher};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use video::{ExtractedFrame, VideoConfig, extract_subject_frames};

use crate::{PipelineError, SharkIdConfig};

/// Optional annotations accompanying an image.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegionHint {
    pub subject_box: Option<BoundingBox>,
    pub zone_box: Option<BoundingBox>,
    pub orientation: Orientation,
}

impl RegionHint {
    pub fn with_boxes(mut self, subject_box: BoundingBox, zone_box: BoundingBox) -> Self {
        self.subject_box = Some(subject_box);
        self.zone_box = Some(zone_box);
        self
    }

    pub fn with_subject(mut self, subject_box: BoundingBox) -> Self {
        self.subject_box = Some(subject_box);
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    fn validate(&self) -> Result<(), PipelineError> {
        if let Some(b) = &self.subject_box {
            b.validate()?;
        }
        if let Some(b) = &self.zone_box {
            b.validate()?;
        }
        Ok(())
    }
}

/// Catalog entry to create or overwrite.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingRequest {
    pub individual_id: String,
    pub display_name: String,
    pub photo_id: String,
    pub hint: RegionHint,
}

impl EmbeddingRequest {
    pub fn new(individual_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            individual_id: individual_id.into(),
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    pub fn with_photo_id(mut self, photo_id: impl Into<String>) -> Self {
        self.photo_id = photo_id.into();
        self
    }

    pub fn with_hint(mut self, hint: RegionHint) -> Self {
        self.hint = hint;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredEmbedding {
    pub individual_id: String,
    pub photo_id: String,
    pub embedding_dim: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Health {
    pub embedding_count: usize,
    pub embedder: String,
    pub embedding_dim: usize,
}

/// Classification outcome for one extracted video frame.
#[derive(Debug)]
pub struct FrameClassification {
    pub frame_index: u64,
    pub candidates: Result<Vec<Candidate>, PipelineError>,
}

/// Owns one embedder, one catalog and a frame worker pool, and runs the
/// detect → embed → classify/store flow for still images and videos.
pub struct Recognizer {
    detector: DetectorConfig,
    embedder: Arc<dyn Embedder>,
    store: Arc<EmbeddingStore>,
    matcher: Matcher,
    video: VideoConfig,
    pool: ThreadPool,
}

impl Recognizer {
    /// Build the embedder and open the catalog described by `cfg`.
    pub fn from_config(cfg: &SharkIdConfig) -> Result<Self, PipelineError> {
        cfg.validate()
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        let embedder = build_embedder(&cfg.embedder)?;
        let store = Arc::new(EmbeddingStore::open(&cfg.store, embedder.dimension())?);
        Self::new(
            cfg.detector.clone(),
            embedder,
            store,
            cfg.matcher.clone(),
            cfg.video.clone(),
            cfg.workers.frame_workers,
        )
    }

    pub fn new(
        detector: DetectorConfig,
        embedder: Arc<dyn Embedder>,
        store: Arc<EmbeddingStore>,
        match_cfg: MatchConfig,
        video: VideoConfig,
        frame_workers: usize,
    ) -> Result<Self, PipelineError> {
        if embedder.dimension() != store.dimension() {
            return Err(PipelineError::Config(format!(
                "embedder {} produces {} dims but the catalog holds {}",
                embedder.name(),
                embedder.dimension(),
                store.dimension()
            )));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(frame_workers.max(1))
            .thread_name(|i| format!("sharkid-frame-{i}"))
            .build()
            .map_err(|e| PipelineError::WorkerPool(e.to_string()))?;
        let matcher = Matcher::new(Arc::clone(&store), match_cfg)?;
        tracing::info!(
            embedder = embedder.name(),
            dim = embedder.dimension(),
            catalog = store.count(),
            frame_workers = pool.current_num_threads(),
            "recognizer ready"
        );
        Ok(Self {
            detector,
            embedder,
            store,
            matcher,
            video,
            pool,
        })
    }

    pub fn store(&self) -> &Arc<EmbeddingStore> {
        &self.store
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedder.dimension()
    }

    pub fn match_config(&self) -> &MatchConfig {
        self.matcher.config()
    }

    /// Propose subject and zone boxes. `Ok(None)` means nothing stood out.
    pub fn detect(&self, bytes: &[u8]) -> Result<Option<Detection>, PipelineError> {
        let img = decode_image(bytes)?;
        Ok(detect::auto_detect(&img, &self.detector))
    }

    /// Rank catalogued individuals for the region chosen from `hint`.
    pub fn classify(&self, bytes: &[u8], hint: &RegionHint) -> Result<Vec<Candidate>, PipelineError> {
        let start = Instant::now();
        let (vector, source) = self.embed_image(bytes, hint)?;
        let candidates = self.matcher.find_candidates(&vector, hint.orientation)?;
        tracing::debug!(
            source = ?source,
            candidates = candidates.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "classified image"
        );
        Ok(candidates)
    }

    /// Embed the image and upsert it under `(individual_id, photo_id)`.
    pub fn store_embedding(
        &self,
        bytes: &[u8],
        request: &EmbeddingRequest,
    ) -> Result<StoredEmbedding, PipelineError> {
        if request.individual_id.trim().is_empty() {
            return Err(PipelineError::InvalidRequest(
                "individual_id is required".into(),
            ));
        }
        let (vector, source) = self.embed_image(bytes, &request.hint)?;
        let embedding_dim = vector.len();
        let record = EmbeddingRecord::new(&request.individual_id, &request.display_name, vector)
            .with_photo_id(&request.photo_id)
            .with_orientation(request.hint.orientation);
        self.store.upsert(record)?;
        tracing::info!(
            individual_id = %request.individual_id,
            photo_id = %request.photo_id,
            source = ?source,
            "stored embedding"
        );
        Ok(StoredEmbedding {
            individual_id: request.individual_id.clone(),
            photo_id: request.photo_id.clone(),
            embedding_dim,
        })
    }

    /// Sample `bytes` and return the frames with a detected subject. Only an
    /// empty payload is an error; unreadable videos give an empty list.
    pub fn process_video(
        &self,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<Vec<ExtractedFrame>, PipelineError> {
        if bytes.is_empty() {
            return Err(PipelineError::EmptyPayload);
        }
        Ok(extract_subject_frames(
            bytes,
            content_type,
            &self.video,
            &self.detector,
        ))
    }

    /// Embed and classify every frame on the worker pool, in frame order.
    /// A failing frame records its error and leaves the others untouched.
    pub fn classify_frames(&self, frames: &[ExtractedFrame]) -> Vec<FrameClassification> {
        self.pool.install(|| {
            frames
                .par_iter()
                .map(|frame| {
                    let candidates = self.classify_frame(frame);
                    if let Err(err) = &candidates {
                        tracing::warn!(
                            frame_index = frame.frame_index,
                            error = %err,
                            "frame classification failed"
                        );
                    }
                    FrameClassification {
                        frame_index: frame.frame_index,
                        candidates,
                    }
                })
                .collect()
        })
    }

    pub fn health(&self) -> Health {
        Health {
            embedding_count: self.store.count(),
            embedder: self.embedder.name().to_string(),
            embedding_dim: self.embedder.dimension(),
        }
    }

    fn classify_frame(&self, frame: &ExtractedFrame) -> Result<Vec<Candidate>, PipelineError> {
        let img = decode_image(&frame.jpeg_bytes)?;
        let region = crop_zone(&img, &frame.subject_box, &frame.zone_box, &self.detector);
        let vector = self.embedder.embed(&region)?;
        Ok(self
            .matcher
            .find_candidates(&vector, Orientation::Unspecified)?)
    }

    fn embed_image(
        &self,
        bytes: &[u8],
        hint: &RegionHint,
    ) -> Result<(Vec<f32>, RegionSource), PipelineError> {
        hint.validate()?;
        let img = decode_image(bytes)?;
        let Region { image, source, .. } = select_region(
            &img,
            hint.subject_box,
            hint.zone_box,
            hint.orientation,
            &self.detector,
        );
        let vector = self.embedder.embed(&image)?;
        Ok((vector, source))
    }
}
