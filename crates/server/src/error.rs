use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sharkid::PipelineError;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Request body is empty")]
    EmptyBody,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unreadable image: {0}")]
    UnreadableImage(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::EmptyBody | ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::UnreadableImage(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Index(_) | ServerError::Internal(_) | ServerError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::EmptyBody => "EMPTY_BODY",
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::UnreadableImage(_) => "UNREADABLE_IMAGE",
            ServerError::Index(_) => "INDEX_ERROR",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Config(_) => "CONFIG_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }

        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

impl From<PipelineError> for ServerError {
    fn from(err: PipelineError) -> Self {
        if err.is_empty_payload() {
            ServerError::EmptyBody
        } else if err.is_unreadable_image() {
            ServerError::UnreadableImage(err.to_string())
        } else if err.is_client_error() {
            ServerError::BadRequest(err.to_string())
        } else if let PipelineError::Index(e) = err {
            ServerError::Index(e.to_string())
        } else if let PipelineError::Config(msg) = err {
            ServerError::Config(msg)
        } else {
            ServerError::Internal(err.to_string())
        }
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("worker task failed: {err}"))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}
