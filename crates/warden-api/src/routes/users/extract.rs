//! Request extractors for the account API

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use tracing::debug;
use warden_auth::bearer_token;

use crate::error::ApiError;

// ==================== Bearer Token ====================

/// Raw bearer token of an authenticated request
///
/// Extract this before any body extractor so that a missing token is
/// reported even when the body is invalid too.
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        bearer_token(&parts.headers)
            .map(|token| BearerToken(token.to_string()))
            .ok_or(ApiError::MissingToken)
    }
}

// ==================== Input Validation ====================

/// Field-level checks run after deserialization
pub trait Validate {
    fn is_valid(&self) -> bool;
}

/// JSON body that deserialized and passed `Validate`
///
/// Every failure, from a missing field to a wrong content type, is the
/// same validation error.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            debug!("Rejected request body: {}", rejection.body_text());
            ApiError::Validation
        })?;

        if !value.is_valid() {
            return Err(ApiError::Validation);
        }

        Ok(ValidatedJson(value))
    }
}
