//! Warden REST API
//!
//! This crate provides the Axum-based HTTP API for Warden: account
//! registration, login, logout and password change, plus health and
//! metrics endpoints. Every JSON response uses the
//! `{success, data | error}` envelope.

pub mod error;
pub mod response;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use response::ApiResponse;
pub use routes::create_router;
pub use state::{AppState, MetricsHandle};
