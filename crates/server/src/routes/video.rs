use crate::error::{ServerError, ServerResult};
use crate::routes::query;
use crate::state::ServerState;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use sharkid::{BoundingBox, Candidate, ExtractedFrame, FrameClassification};
use std::sync::Arc;

const DEFAULT_CONTENT_TYPE: &str = "video/mp4";

#[derive(Debug, Default, Deserialize)]
pub struct VideoQuery {
    /// Attach per-frame candidates.
    #[serde(default)]
    pub classify: bool,
}

#[derive(Debug, Serialize)]
pub struct FramePayload {
    /// Base64 of the re-encoded JPEG.
    pub jpeg_bytes: String,
    pub subject_box: BoundingBox,
    pub zone_box: BoundingBox,
    pub timestamp_sec: f64,
    pub frame_index: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<Candidate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FramePayload {
    fn new(frame: ExtractedFrame) -> Self {
        Self {
            jpeg_bytes: STANDARD.encode(&frame.jpeg_bytes),
            subject_box: frame.subject_box,
            zone_box: frame.zone_box,
            timestamp_sec: frame.timestamp_sec,
            frame_index: frame.frame_index,
            candidates: None,
            error: None,
        }
    }

    fn with_classification(mut self, result: FrameClassification) -> Self {
        match result.candidates {
            Ok(candidates) => self.candidates = Some(candidates),
            Err(err) => self.error = Some(err.to_string()),
        }
        self
    }
}

#[derive(Debug, Serialize)]
pub struct VideoResponse {
    pub frames: Vec<FramePayload>,
    pub count: usize,
}

/// `POST /process-video`: `Content-Type` names the container.
pub async fn process_video(
    State(state): State<Arc<ServerState>>,
    params: Result<Query<VideoQuery>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Json<VideoResponse>> {
    let classify = query(params)?.classify;
    if body.is_empty() {
        return Err(ServerError::EmptyBody);
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();

    let recognizer = Arc::clone(&state.recognizer);
    let frames = tokio::task::spawn_blocking(move || {
        let frames = recognizer.process_video(&body, &content_type)?;
        let classified = classify.then(|| recognizer.classify_frames(&frames));
        let payloads: Vec<FramePayload> = match classified {
            Some(results) => frames
                .into_iter()
                .zip(results)
                .map(|(frame, result)| FramePayload::new(frame).with_classification(result))
                .collect(),
            None => frames.into_iter().map(FramePayload::new).collect(),
        };
        Ok::<_, sharkid::PipelineError>(payloads)
    })
    .await??;

    tracing::info!(count = frames.len(), classify, "video processed");
    Ok(Json(VideoResponse {
        count: frames.len(),
        frames,
    }))
}
