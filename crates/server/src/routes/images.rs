//! Still-image endpoints. The request body is the raw image; annotations
//! travel as query parameters.

use crate::error::{ServerError, ServerResult};
use crate::routes::query;
use crate::state::ServerState;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use sharkid::{BoundingBox, Candidate, EmbeddingRequest, Orientation, RegionHint, StoredEmbedding};
use std::sync::Arc;

/// Optional subject/zone boxes (normalized coordinates) and orientation.
#[derive(Debug, Default, Deserialize)]
pub struct RegionQuery {
    pub subject_x: Option<f32>,
    pub subject_y: Option<f32>,
    pub subject_w: Option<f32>,
    pub subject_h: Option<f32>,
    pub zone_x: Option<f32>,
    pub zone_y: Option<f32>,
    pub zone_w: Option<f32>,
    pub zone_h: Option<f32>,
    pub orientation: Option<String>,
}

impl RegionQuery {
    pub fn hint(&self) -> ServerResult<RegionHint> {
        let orientation = match self.orientation.as_deref() {
            Some(raw) => raw
                .parse::<Orientation>()
                .map_err(|e| ServerError::BadRequest(e.to_string()))?,
            None => Orientation::Unspecified,
        };
        Ok(RegionHint {
            subject_box: whole_box(
                "subject",
                [self.subject_x, self.subject_y, self.subject_w, self.subject_h],
            )?,
            zone_box: whole_box("zone", [self.zone_x, self.zone_y, self.zone_w, self.zone_h])?,
            orientation,
        })
    }
}

/// All four coordinates or none.
fn whole_box(prefix: &str, parts: [Option<f32>; 4]) -> ServerResult<Option<BoundingBox>> {
    match parts {
        [Some(x), Some(y), Some(w), Some(h)] => Ok(Some(BoundingBox::new(x, y, w, h))),
        [None, None, None, None] => Ok(None),
        _ => Err(ServerError::BadRequest(format!(
            "{prefix}_x, {prefix}_y, {prefix}_w and {prefix}_h must be given together"
        ))),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    #[serde(default)]
    pub individual_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub photo_id: String,
}

#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub subject_box: Option<BoundingBox>,
    pub zone_box: Option<BoundingBox>,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Serialize)]
pub struct StoreResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub stored: StoredEmbedding,
}

/// `POST /detect`: boxes are `null` when nothing stood out.
pub async fn detect(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> ServerResult<Json<DetectResponse>> {
    if body.is_empty() {
        return Err(ServerError::EmptyBody);
    }
    let recognizer = Arc::clone(&state.recognizer);
    let detection = tokio::task::spawn_blocking(move || recognizer.detect(&body)).await??;
    Ok(Json(DetectResponse {
        subject_box: detection.map(|d| d.subject_box),
        zone_box: detection.map(|d| d.zone_box),
    }))
}

/// `POST /classify`
pub async fn classify(
    State(state): State<Arc<ServerState>>,
    region: Result<Query<RegionQuery>, QueryRejection>,
    body: Bytes,
) -> ServerResult<Json<ClassifyResponse>> {
    let hint = query(region)?.hint()?;
    if body.is_empty() {
        return Err(ServerError::EmptyBody);
    }
    let recognizer = Arc::clone(&state.recognizer);
    let candidates =
        tokio::task::spawn_blocking(move || recognizer.classify(&body, &hint)).await??;
    Ok(Json(ClassifyResponse { candidates }))
}

/// `POST /embeddings`
pub async fn store_embedding(
    State(state): State<Arc<ServerState>>,
    region: Result<Query<RegionQuery>, QueryRejection>,
    catalog: Result<Query<CatalogQuery>, QueryRejection>,
    body: Bytes,
) -> ServerResult<Json<StoreResponse>> {
    let hint = query(region)?.hint()?;
    let catalog = query(catalog)?;
    if body.is_empty() {
        return Err(ServerError::EmptyBody);
    }
    let request = EmbeddingRequest::new(catalog.individual_id, catalog.display_name)
        .with_photo_id(catalog.photo_id)
        .with_hint(hint);
    let recognizer = Arc::clone(&state.recognizer);
    let stored =
        tokio::task::spawn_blocking(move || recognizer.store_embedding(&body, &request)).await??;
    Ok(Json(StoreResponse {
        status: "stored",
        stored,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_parameters_means_auto_detection() {
        let hint = RegionQuery::default().hint().unwrap();
        assert_eq!(hint, RegionHint::default());
    }

    #[test]
    fn complete_boxes_and_orientation_are_parsed() {
        let q = RegionQuery {
            subject_x: Some(0.1),
            subject_y: Some(0.2),
            subject_w: Some(0.5),
            subject_h: Some(0.4),
            orientation: Some("Left".into()),
            ..Default::default()
        };
        let hint = q.hint().unwrap();
        assert_eq!(hint.subject_box, Some(BoundingBox::new(0.1, 0.2, 0.5, 0.4)));
        assert_eq!(hint.zone_box, None);
        assert_eq!(hint.orientation, Orientation::FaceLeft);
    }

    #[test]
    fn partial_box_is_rejected() {
        let q = RegionQuery {
            zone_x: Some(0.1),
            zone_w: Some(0.3),
            ..Default::default()
        };
        let err = q.hint().unwrap_err();
        assert_eq!(err.error_code(), "BAD_REQUEST");
        assert!(err.to_string().contains("zone_x"));
    }

    #[test]
    fn unknown_orientation_is_rejected() {
        let q = RegionQuery {
            orientation: Some("upside_down".into()),
            ..Default::default()
        };
        assert!(matches!(q.hint(), Err(ServerError::BadRequest(_))));
    }
}
