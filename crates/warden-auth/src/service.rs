//! Authentication service
//!
//! Orchestrates the account store, password hasher, token manager and
//! revocation store into register, login, logout and change-password.
//! The service holds no mutable state of its own and is shared across
//! request handlers.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use warden_db::{Database, NewUser};

use crate::error::AuthError;
use crate::jwt::JwtManager;
use crate::middleware::AuthUser;
use crate::password::CredentialHasher;
use crate::revocation::{RevocationStore, SessionCutoff};

/// What a successful password change does to the user's other sessions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PasswordChangePolicy {
    /// Every issued token stays valid until it expires or is logged out
    #[default]
    KeepSessions,
    /// Tokens issued before the change are revoked, except the one used for it
    RevokeOthers,
}

/// Result of a registration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    pub user_id: i64,
    pub username: String,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: Database,
    hasher: CredentialHasher,
    jwt: Arc<JwtManager>,
    revocations: RevocationStore,
    password_change_policy: PasswordChangePolicy,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        db: Database,
        hasher: CredentialHasher,
        jwt: Arc<JwtManager>,
        revocations: RevocationStore,
        password_change_policy: PasswordChangePolicy,
    ) -> Self {
        Self {
            db,
            hasher,
            jwt,
            revocations,
            password_change_policy,
        }
    }

    /// Create an account
    pub async fn register(&self, username: &str, password: &str) -> Result<RegisteredUser, AuthError> {
        debug!("Registering user: {}", username);

        let password_hash = self.hasher.hash(password).await?;
        let user = self
            .db
            .insert_user(NewUser {
                username: username.to_string(),
                password_hash,
            })
            .await
            .inspect_err(|e| {
                if matches!(e, warden_db::DbError::Duplicate(_)) {
                    warn!("Registration rejected, username taken: {}", username);
                }
            })?;

        info!("Created user: {} ({})", user.username, user.id);

        Ok(RegisteredUser {
            user_id: user.id,
            username: user.username,
        })
    }

    /// Check credentials and issue a token
    ///
    /// Unknown usernames and wrong passwords fail identically, including in
    /// the time they take.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        debug!("Login attempt for user: {}", username);

        let Some(user) = self.db.get_user_by_username(username).await? else {
            self.hasher.verify_dummy(password).await?;
            warn!("Login failed for user: {}", username);
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &user.password_hash).await? {
            warn!("Login failed for user: {}", username);
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.jwt.generate_token(user.id, &user.username)?;

        info!("User {} logged in successfully", user.username);
        Ok(token)
    }

    /// Resolve a bearer token to its user
    ///
    /// The token must verify and must not have been revoked, either
    /// directly by logout or through a password-change cutoff.
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.jwt.validate_token(token)?;

        if self.revocations.is_revoked(token).await? {
            warn!("Rejected revoked token for user: {}", claims.username);
            return Err(AuthError::TokenRevoked);
        }

        let user = AuthUser::from_claims(&claims)?;

        if self.password_change_policy == PasswordChangePolicy::RevokeOthers
            && let Some(cutoff) = self.revocations.session_cutoff(user.id).await?
            && cutoff.revokes(&claims)
        {
            warn!("Rejected token predating password change for user: {}", user.username);
            return Err(AuthError::TokenRevoked);
        }

        debug!("Authenticated user: {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Revoke the presented token for the rest of its lifetime
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let user = self.authenticate(token).await?;

        let remaining = user.expires_at - Utc::now();
        self.revocations.revoke(token, remaining).await?;

        info!("User {} logged out", user.username);
        Ok(())
    }

    /// Replace the password of the token's owner
    ///
    /// The token used for the change stays valid.
    pub async fn change_password(
        &self,
        token: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let caller = self.authenticate(token).await?;

        // A token outliving its account is as good as forged
        let user = self
            .db
            .get_user_by_id(caller.id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if !self.hasher.verify(old_password, &user.password_hash).await? {
            warn!("Password change rejected for user: {}", user.username);
            return Err(AuthError::IncorrectPassword);
        }

        let new_hash = self.hasher.hash(new_password).await?;
        self.db.update_user_password(user.id, &new_hash).await?;

        if self.password_change_policy == PasswordChangePolicy::RevokeOthers {
            let cutoff = SessionCutoff {
                cutoff: Utc::now().timestamp_millis(),
                keep: caller.token_id.clone(),
            };
            self.revocations
                .revoke_user_sessions(user.id, &cutoff, self.jwt.token_ttl()?)
                .await?;
        }

        info!("Password changed for user: {}", user.username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use warden_db::UsernamePolicy;

    use super::*;
    use crate::password::HashingParams;

    async fn service_with(policy: PasswordChangePolicy) -> AuthService {
        let db = Database::in_memory(UsernamePolicy::CaseSensitive).await.unwrap();
        let hasher = CredentialHasher::new(&HashingParams {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        let jwt = Arc::new(JwtManager::new("test-secret-key", 24));

        AuthService::new(db, hasher, jwt, RevocationStore::in_memory(), policy)
    }

    async fn service() -> AuthService {
        service_with(PasswordChangePolicy::KeepSessions).await
    }

    #[tokio::test]
    async fn test_register_then_duplicate() {
        let auth = service().await;

        let user = auth.register("alice", "pw1").await.unwrap();
        assert_eq!(user.username, "alice");

        let err = auth.register("alice", "pw2").await.unwrap_err();
        assert!(matches!(err, AuthError::UsernameTaken));
    }

    #[tokio::test]
    async fn test_concurrent_registration_single_winner() {
        let auth = service().await;

        let (a, b) = tokio::join!(auth.register("bob", "pw"), auth.register("bob", "pw"));
        let results = [a, b];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(AuthError::UsernameTaken)))
        );
    }

    #[tokio::test]
    async fn test_login_token_carries_registered_id() {
        let auth = service().await;

        let registered = auth.register("alice", "pw1").await.unwrap();
        let token = auth.login("alice", "pw1").await.unwrap();
        let user = auth.authenticate(&token).await.unwrap();

        assert_eq!(user.id, registered.user_id);
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let auth = service().await;
        auth.register("alice", "pw1").await.unwrap();

        let wrong_password = auth.login("alice", "nope").await.unwrap_err();
        let unknown_user = auth.login("mallory", "pw1").await.unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_user, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let auth = service().await;
        auth.register("alice", "pw1").await.unwrap();
        let token = auth.login("alice", "pw1").await.unwrap();

        auth.logout(&token).await.unwrap();

        assert!(matches!(auth.authenticate(&token).await, Err(AuthError::TokenRevoked)));
        assert!(matches!(auth.logout(&token).await, Err(AuthError::TokenRevoked)));
        assert!(matches!(
            auth.change_password(&token, "pw1", "pw2").await,
            Err(AuthError::TokenRevoked)
        ));
    }

    #[tokio::test]
    async fn test_logout_leaves_other_tokens() {
        let auth = service().await;
        auth.register("alice", "pw1").await.unwrap();
        let first = auth.login("alice", "pw1").await.unwrap();
        let second = auth.login("alice", "pw1").await.unwrap();

        auth.logout(&first).await.unwrap();

        assert!(auth.authenticate(&second).await.is_ok());
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let auth = service().await;

        assert!(matches!(auth.logout("garbage").await, Err(AuthError::InvalidToken)));
        assert!(matches!(
            auth.change_password("garbage", "a", "b").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_change_password_rotates_credentials() {
        let auth = service().await;
        auth.register("alice", "123456").await.unwrap();
        let token = auth.login("alice", "123456").await.unwrap();

        auth.change_password(&token, "123456", "654321").await.unwrap();

        assert!(matches!(
            auth.login("alice", "123456").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(auth.login("alice", "654321").await.is_ok());
        // The session that made the change is still good
        assert!(auth.authenticate(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_change_password_wrong_old_keeps_hash() {
        let auth = service().await;
        auth.register("alice", "123456").await.unwrap();
        let token = auth.login("alice", "123456").await.unwrap();

        let err = auth
            .change_password(&token, "senhaErrada", "654321")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::IncorrectPassword));

        assert!(auth.login("alice", "123456").await.is_ok());
        assert!(auth.login("alice", "654321").await.is_err());
    }

    #[tokio::test]
    async fn test_keep_sessions_policy_leaves_other_tokens() {
        let auth = service().await;
        auth.register("alice", "pw1").await.unwrap();
        let other = auth.login("alice", "pw1").await.unwrap();
        let current = auth.login("alice", "pw1").await.unwrap();

        auth.change_password(&current, "pw1", "pw2").await.unwrap();

        assert!(auth.authenticate(&other).await.is_ok());
    }

    #[tokio::test]
    async fn test_revoke_others_policy() {
        let auth = service_with(PasswordChangePolicy::RevokeOthers).await;
        auth.register("alice", "pw1").await.unwrap();
        let other = auth.login("alice", "pw1").await.unwrap();
        let current = auth.login("alice", "pw1").await.unwrap();

        // Cutoffs have millisecond resolution
        tokio::time::sleep(StdDuration::from_millis(5)).await;
        auth.change_password(&current, "pw1", "pw2").await.unwrap();

        assert!(matches!(auth.authenticate(&other).await, Err(AuthError::TokenRevoked)));
        assert!(auth.authenticate(&current).await.is_ok());

        let fresh = auth.login("alice", "pw2").await.unwrap();
        assert!(auth.authenticate(&fresh).await.is_ok());
    }

    #[tokio::test]
    async fn test_alice_scenario() {
        let auth = service().await;

        auth.register("alice", "pw1").await.unwrap();
        assert!(matches!(
            auth.register("alice", "pw2").await,
            Err(AuthError::UsernameTaken)
        ));
        let token = auth.login("alice", "pw1").await.unwrap();
        auth.logout(&token).await.unwrap();
        assert!(auth.logout(&token).await.is_err());
    }
}
