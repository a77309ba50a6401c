// src/models/auth.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// DTO for admin login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: &'static str,
    pub expires_in: u64,
}
