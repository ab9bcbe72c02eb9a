//! API route handlers
//!
//! - `health`: liveness and Prometheus metrics
//! - `images`: detection, classification and cataloguing of still images
//! - `video`: frame harvesting from uploaded clips

pub mod health;
pub mod images;
pub mod video;

use crate::error::{ServerError, ServerResult};
use axum::extract::rejection::QueryRejection;
use axum::extract::Query;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "SharkID Server",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "POST /detect",
            "POST /classify",
            "POST /embeddings",
            "POST /process-video",
            "GET /health",
            "GET /metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}

/// Unwrap a query extractor, reporting malformed parameters as
/// `BAD_REQUEST` JSON instead of axum's plain-text rejection.
pub(crate) fn query<T>(query: Result<Query<T>, QueryRejection>) -> ServerResult<T> {
    query
        .map(|Query(inner)| inner)
        .map_err(|rejection| ServerError::BadRequest(rejection.body_text()))
}
