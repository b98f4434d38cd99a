//! Mapping from engine errors to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use engine::{EngineError, StoreError, ValidationError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("malformed request body: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Engine(EngineError::RuleNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Engine(EngineError::RuleDisabled(_)) => StatusCode::CONFLICT,
            Self::Engine(EngineError::Validation(_)) | Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Engine(EngineError::Store(StoreError::Unavailable(_))) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Engine(EngineError::WorkerPoolClosed) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Engine(EngineError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%status, error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
