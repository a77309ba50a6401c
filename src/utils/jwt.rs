// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

pub const ADMIN_ROLE: &str = "admin";

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - the admin username.
    pub sub: String,
    pub role: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// Signs a new JWT valid for `expiration_seconds`.
pub fn sign_jwt(
    username: &str,
    role: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: username.to_owned(),
        role: role.to_owned(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Axum Middleware: Admin gate.
///
/// Requires 'Authorization: Bearer <token>' carrying the admin role.
/// Injects `Claims` into the request extensions for handlers.
/// Missing or invalid tokens get 401, other roles get 403.
pub async fn admin_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let claims = verify_jwt(token, &config.jwt_secret).map_err(|_| StatusCode::UNAUTHORIZED)?;
    if claims.role != ADMIN_ROLE {
        return Err(StatusCode::FORBIDDEN);
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
