//! API routes

mod health;
pub mod metrics;
mod users;

use axum::{Router, extract::DefaultBodyLimit};
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::{AppState, MetricsHandle};

/// Request bodies here are a handful of short strings
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Fallback for unknown paths and unsupported methods
pub(crate) async fn route_not_found() -> ApiError {
    ApiError::RouteNotFound
}

/// Create the main router
pub fn create_router(state: AppState, metrics_handle: Option<Arc<MetricsHandle>>) -> Router {
    let mut router = Router::new()
        // Health check
        .merge(health::routes())
        // Account API
        .merge(users::routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    // Add metrics endpoint if handle is provided
    if let Some(handle) = metrics_handle {
        router = router.merge(metrics::routes(handle));
    }

    router.fallback(route_not_found)
}
