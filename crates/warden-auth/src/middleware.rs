//! Bearer token extraction and the authenticated caller

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::jwt::Claims;

/// Authenticated user information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    /// `jti` of the token that authenticated the request
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthUser {
    /// Create from JWT claims
    pub fn from_claims(claims: &Claims) -> Result<Self, AuthError> {
        Ok(Self {
            id: claims.user_id()?,
            username: claims.username.clone(),
            token_id: claims.jti.clone(),
            expires_at: DateTime::from_timestamp(claims.exp, 0).ok_or(AuthError::InvalidToken)?,
        })
    }
}

/// Extract the bearer token from the Authorization header
///
/// Anything other than a non-empty `Bearer` credential counts as no token.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_from_claims() {
        let claims = Claims {
            sub: "42".to_string(),
            username: "alice".to_string(),
            exp: 1_700_000_000,
            iat: 1_699_996_400,
            iat_ms: 1_699_996_400_000,
            jti: "t-1".to_string(),
        };

        let user = AuthUser::from_claims(&claims).unwrap();
        assert_eq!(user.id, 42);
        assert_eq!(user.token_id, "t-1");
        assert_eq!(user.expires_at.timestamp(), 1_700_000_000);

        let bad = Claims {
            sub: "not-a-number".to_string(),
            ..claims
        };
        assert!(matches!(AuthUser::from_claims(&bad), Err(AuthError::InvalidToken)));
    }
}
