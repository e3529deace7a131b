//! Health check endpoints

use axum::{Router, routing::get};
use serde::Serialize;

use crate::response::ApiResponse;
use crate::state::AppState;

use super::route_not_found;

/// Health status response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check handler
async fn health() -> ApiResponse<HealthResponse> {
    // Record health check metric
    metrics::counter!("warden_health_checks_total").increment(1);

    ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health).fallback(route_not_found))
        .route("/healthz", get(health).fallback(route_not_found))
}
