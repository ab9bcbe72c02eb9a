use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use sharkid::Health;
use std::sync::Arc;
use std::time::SystemTime;

/// Global server start time for uptime calculation
static SERVER_START_TIME: once_cell::sync::Lazy<SystemTime> =
    once_cell::sync::Lazy::new(SystemTime::now);

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    #[serde(flatten)]
    pub engine: Health,
    pub uptime_seconds: u64,
    pub timestamp: String,
}

/// Liveness plus catalog size
pub async fn health_check(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    let uptime = SERVER_START_TIME
        .elapsed()
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "ok",
        service: "sharkid-server",
        engine: state.recognizer.health(),
        uptime_seconds: uptime,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    let handle = state.metrics.as_ref().ok_or(ServerError::NotFound)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}

/// Pin the uptime origin at startup rather than at the first probe.
pub(crate) fn mark_start() {
    once_cell::sync::Lazy::force(&SERVER_START_TIME);
}
