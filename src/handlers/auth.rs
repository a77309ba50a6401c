// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError,
    models::auth::{LoginRequest, TokenResponse},
    state::AppState,
    store::{Store, StoreKey},
    utils::jwt::{ADMIN_ROLE, Claims, sign_jwt},
};

/// Authenticates the admin and returns a JWT token.
///
/// Marks the admin session as logged in.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if !state.admin.verify(&payload.username, &payload.password)? {
        tracing::warn!("Rejected admin login for '{}'", payload.username);
        return Err(AppError::AuthError("Invalid username or password".to_string()));
    }

    let token = sign_jwt(
        state.admin.username(),
        ADMIN_ROLE,
        &state.config.jwt_secret,
        state.config.jwt_expiration,
    )?;

    state.store.save(StoreKey::AdminLoggedIn, &true).await?;
    tracing::info!("Admin '{}' logged in", payload.username);

    Ok(Json(TokenResponse {
        token,
        token_type: "Bearer",
        expires_in: state.config.jwt_expiration,
    }))
}

/// Clears the admin session flag. Issued tokens stay valid until expiry.
pub async fn logout(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    store.save(StoreKey::AdminLoggedIn, &false).await?;
    tracing::info!("Admin '{}' logged out", claims.sub);

    Ok(StatusCode::NO_CONTENT)
}
