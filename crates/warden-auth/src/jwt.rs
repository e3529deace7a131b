//! JWT token management

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AuthError;

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Username
    pub username: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issued at in Unix milliseconds, compared against session cutoffs
    pub iat_ms: i64,
    /// Token ID, keeps tokens issued within the same second distinct
    pub jti: String,
}

impl Claims {
    /// Numeric user ID carried in `sub`
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }
}

/// Why a token was rejected. Only ever logged, callers see `InvalidToken`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Malformed,
    Signature,
    Expired,
}

impl Rejection {
    fn as_str(&self) -> &'static str {
        match self {
            Rejection::Malformed => "malformed",
            Rejection::Signature => "signature",
            Rejection::Expired => "expired",
        }
    }
}

/// JWT manager for token generation and validation
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry_hours: i64,
}

impl JwtManager {
    /// Create a new JWT manager
    pub fn new(secret: &str, token_expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_expiry_hours,
        }
    }

    /// Validity window of every issued token
    pub fn token_ttl(&self) -> Result<Duration, AuthError> {
        Duration::try_hours(self.token_expiry_hours).ok_or_else(|| {
            AuthError::Internal(format!(
                "Token lifetime of {} hours is out of range",
                self.token_expiry_hours
            ))
        })
    }

    /// Generate a JWT token for a user
    pub fn generate_token(&self, user_id: i64, username: &str) -> Result<String, AuthError> {
        self.generate_token_at(user_id, username, Utc::now())
    }

    fn generate_token_at(
        &self,
        user_id: i64,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let exp = now
            .checked_add_signed(self.token_ttl()?)
            .ok_or_else(|| AuthError::Internal("Token expiry is out of range".to_string()))?;

        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iat_ms: now.timestamp_millis(),
            jti: Uuid::new_v4().to_string(),
        };

        debug!("Generating token for user: {}", username);

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Token signing failed: {}", e)))
    }

    /// Validate a JWT token and return claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.decode_claims(token, Utc::now().timestamp()).map_err(|reason| {
            warn!("Rejected token: {}", reason.as_str());
            AuthError::InvalidToken
        })
    }

    fn decode_claims(&self, token: &str, now: i64) -> Result<Claims, Rejection> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => Rejection::Signature,
                ErrorKind::ExpiredSignature => Rejection::Expired,
                _ => Rejection::Malformed,
            })?;

        // A token is dead from the instant `exp` is reached
        if token_data.claims.exp <= now {
            return Err(Rejection::Expired);
        }

        Ok(token_data.claims)
    }
}
