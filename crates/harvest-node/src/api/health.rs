//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// `"configured"`, or `"disabled"` when every message and validation
    /// uses its deterministic fallback.
    pub text_service: &'static str,
}

/// Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let text_service = if state.coordinator.text_service_enabled() {
        "configured"
    } else {
        "disabled"
    };

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        text_service,
    })
}
