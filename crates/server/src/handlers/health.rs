//! Health and fallback endpoints.

use crate::error::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub storage: &'static str,
    pub version: &'static str,
}

/// GET /health - Health check.
///
/// Unauthenticated so load balancers and probes can reach it. Answers 503
/// when the sink is unreachable.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let sink = state.sink();
    sink.health_check().await.map_err(|e| {
        tracing::warn!(error = %e, backend = sink.backend_name(), "Storage health check failed");
        ApiError::Unavailable(e.to_string())
    })?;

    Ok(Json(HealthResponse {
        status: "ok",
        storage: sink.backend_name(),
        version: env!("CARGO_PKG_VERSION"),
    }))
}

/// Any route that matches nothing.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}
