//! Account routes
//!
//! Registration, login, logout and password change. Handlers only move
//! data between the HTTP envelope and `AuthService`.

mod extract;
mod types;

use axum::{
    Router,
    extract::State,
    routing::{patch, post},
};
use tracing::debug;

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

use super::route_not_found;
use extract::{BearerToken, ValidatedJson};
use types::{
    ChangePasswordRequest, CreateUserRequest, CreateUserResponse, LoginRequest, LoginResponse,
    MessageResponse,
};

/// POST /users
async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> Result<ApiResponse<CreateUserResponse>, ApiError> {
    let user = state
        .auth
        .register(&request.username, &request.password)
        .await?;

    metrics::counter!("warden_registrations_total").increment(1);

    Ok(ApiResponse::created(CreateUserResponse {
        user_id: user.user_id,
        username: user.username,
        message: "user created successfully".to_string(),
    }))
}

/// POST /users/login
async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, ApiError> {
    let result = state.auth.login(&request.username, &request.password).await;

    let outcome = if result.is_ok() { "success" } else { "failure" };
    metrics::counter!("warden_logins_total", "outcome" => outcome).increment(1);

    Ok(ApiResponse::ok(LoginResponse { token: result? }))
}

/// POST /users/logout
async fn logout(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<ApiResponse<MessageResponse>, ApiError> {
    state.auth.logout(&token).await?;

    metrics::counter!("warden_logouts_total").increment(1);

    Ok(ApiResponse::ok(MessageResponse::new("logout successful")))
}

/// PATCH /users/password
async fn change_password(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> Result<ApiResponse<MessageResponse>, ApiError> {
    debug!("Password change requested");

    let result = state
        .auth
        .change_password(&token, &request.old_password, &request.new_password)
        .await;

    let outcome = if result.is_ok() { "success" } else { "failure" };
    metrics::counter!("warden_password_changes_total", "outcome" => outcome).increment(1);
    result?;

    Ok(ApiResponse::ok(MessageResponse::new(
        "password changed successfully",
    )))
}

/// Create account routes
///
/// Other methods on these paths answer like unknown routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register).fallback(route_not_found))
        .route("/users/login", post(login).fallback(route_not_found))
        .route("/users/logout", post(logout).fallback(route_not_found))
        .route(
            "/users/password",
            patch(change_password).fallback(route_not_found),
        )
}
