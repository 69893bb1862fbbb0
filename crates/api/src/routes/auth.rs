//! Signup, login and profile endpoints.

use axum::{body::Bytes, extract::State, Json};
use telemetry::metrics;

use watch_core::{LoginRequest, SignupRequest, TokenResponse, UserProfile};

use crate::extractors::{json_body, AuthUser};
use crate::response::ApiError;
use crate::state::AppState;

/// POST /api/auth/signup
pub async fn signup_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TokenResponse>, ApiError> {
    let request: SignupRequest = json_body(&body)?;
    let token = state.credentials.signup(request).await?;
    Ok(Json(token))
}

/// POST /api/auth/login
pub async fn login_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TokenResponse>, ApiError> {
    let request: LoginRequest = json_body(&body)?;
    let token = state.credentials.login(request).await.map_err(|e| {
        metrics().auth_failures.inc();
        ApiError::from(e)
    })?;
    Ok(Json(token))
}

/// GET /api/auth/me
pub async fn me_handler(AuthUser(user): AuthUser) -> Json<UserProfile> {
    Json(UserProfile::from(&user))
}
