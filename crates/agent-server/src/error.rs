use agent_core::MonitorError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

/// Failure of an API request, rendered as `{"error": "..."}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        if err.is_not_found() {
            ApiError::NotFound(err.to_string())
        } else {
            tracing::error!("Request failed: {}", err);
            ApiError::Internal(err.to_string())
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        tracing::error!("Blocking task failed: {}", err);
        ApiError::Internal(format!("Internal task failed: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
