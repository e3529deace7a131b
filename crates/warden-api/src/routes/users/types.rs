//! Request/Response DTOs for the account API

use serde::{Deserialize, Serialize};

use super::extract::Validate;

/// Maximum allowed username length
const MAX_USERNAME_LENGTH: usize = 64;
/// Maximum allowed password length
const MAX_PASSWORD_LENGTH: usize = 256;

fn valid_username(username: &str) -> bool {
    !username.trim().is_empty() && username.len() <= MAX_USERNAME_LENGTH
}

fn valid_password(password: &str) -> bool {
    !password.is_empty() && password.len() <= MAX_PASSWORD_LENGTH
}

// ==================== Requests ====================

/// Registration request
#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
}

impl Validate for CreateUserRequest {
    fn is_valid(&self) -> bool {
        valid_username(&self.username) && valid_password(&self.password)
    }
}

/// Login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn is_valid(&self) -> bool {
        valid_username(&self.username) && valid_password(&self.password)
    }
}

/// Password change request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

impl Validate for ChangePasswordRequest {
    fn is_valid(&self) -> bool {
        valid_password(&self.old_password) && valid_password(&self.new_password)
    }
}

// ==================== Responses ====================

/// Registration response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserResponse {
    pub user_id: i64,
    pub username: String,
    pub message: String,
}

/// Login response
#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Plain confirmation message
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}
