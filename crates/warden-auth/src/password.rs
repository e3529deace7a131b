//! Password hashing with Argon2id
//!
//! Hashing is deliberately expensive, so both hashing and verification run
//! on the blocking thread pool instead of the async workers.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AuthError;

/// Argon2 work factors
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HashingParams {
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

fn default_memory_kib() -> u32 {
    Params::DEFAULT_M_COST
}

fn default_iterations() -> u32 {
    Params::DEFAULT_T_COST
}

fn default_parallelism() -> u32 {
    Params::DEFAULT_P_COST
}

impl Default for HashingParams {
    fn default() -> Self {
        Self {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

/// Salted one-way password hasher
#[derive(Clone)]
pub struct CredentialHasher {
    params: Params,
    /// Verified against when the account does not exist, so unknown
    /// usernames cost as much as wrong passwords
    dummy_hash: Arc<str>,
}

impl CredentialHasher {
    /// Create a hasher with the given work factors
    pub fn new(params: &HashingParams) -> Result<Self, AuthError> {
        let params = Params::new(params.memory_kib, params.iterations, params.parallelism, None)
            .map_err(|e| AuthError::PasswordHash(format!("Invalid Argon2 parameters: {}", e)))?;

        let mut hasher = Self {
            params,
            dummy_hash: Arc::from(""),
        };
        hasher.dummy_hash = Arc::from(hasher.hash_blocking("warden-timing-equalizer")?);
        Ok(hasher)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password, returning a PHC string with the salt embedded
    pub fn hash_blocking(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::PasswordHash(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against a stored PHC string
    ///
    /// The work factors are read from the stored hash, so hashes made with
    /// older parameters keep verifying. Comparison is constant-time.
    pub fn verify_blocking(&self, password: &str, password_hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|e| AuthError::PasswordHash(format!("Invalid password hash format: {}", e)))?;

        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::PasswordHash(format!(
                "Password verification failed: {}",
                e
            ))),
        }
    }

    /// Hash a password on the blocking pool
    pub async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.clone();
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || hasher.hash_blocking(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("Task join error: {}", e)))?
    }

    /// Verify a password on the blocking pool
    pub async fn verify(&self, password: &str, password_hash: &str) -> Result<bool, AuthError> {
        let hasher = self.clone();
        let password = password.to_owned();
        let password_hash = password_hash.to_owned();

        tokio::task::spawn_blocking(move || hasher.verify_blocking(&password, &password_hash))
            .await
            .map_err(|e| AuthError::Internal(format!("Task join error: {}", e)))?
    }

    /// Spend one verification worth of work without a real account
    pub async fn verify_dummy(&self, password: &str) -> Result<(), AuthError> {
        debug!("Running dummy password verification");
        let dummy = Arc::clone(&self.dummy_hash);
        self.verify(password, &dummy).await.map(|_| ())
    }
}
