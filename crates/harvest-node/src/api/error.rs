//! Mapping of orchestration errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use harvest_core::HarvestError;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// Handler error wrapping a [`HarvestError`].
#[derive(Debug)]
pub struct ApiError(pub HarvestError);

impl From<HarvestError> for ApiError {
    fn from(err: HarvestError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            HarvestError::NotFound { .. } => StatusCode::NOT_FOUND,
            HarvestError::InvalidStatus { .. } => StatusCode::CONFLICT,
            e if e.is_input_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }

        let body = ErrorResponse {
            error: self.0.to_string(),
            kind: self.0.kind().to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
