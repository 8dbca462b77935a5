use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::UserResponse;
use crate::routes::bearer_token;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Requested session lifetime; clamped to one hour
    #[serde(default)]
    pub expires_in_seconds: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub token: String,
}

/// Log in with email and password
///
/// Issues a session token and a new refresh token. An unknown email and a
/// wrong password both return the same 401.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let db = state.db.clone();
    let tokens = state.tokens.clone();

    let session = tokio::task::spawn_blocking(move || {
        tokens.login(
            &db,
            &payload.email,
            &payload.password,
            payload.expires_in_seconds,
        )
    })
    .await??;

    Ok(Json(LoginResponse {
        user: UserResponse::from(&session.user),
        token: session.token,
        refresh_token: session.refresh_token,
    }))
}

/// Exchange a refresh token for a new session token
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>> {
    let refresh_token = bearer_token(&headers)?.to_string();
    let db = state.db.clone();
    let tokens = state.tokens.clone();

    let token = tokio::task::spawn_blocking(move || tokens.refresh(&db, &refresh_token)).await??;

    Ok(Json(RefreshResponse { token }))
}

/// Revoke a refresh token
///
/// An unknown token is reported as 401 rather than 404.
pub async fn revoke(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode> {
    let refresh_token = bearer_token(&headers)?.to_string();
    let db = state.db.clone();
    let tokens = state.tokens.clone();

    tokio::task::spawn_blocking(move || tokens.revoke(&db, &refresh_token))
        .await?
        .map_err(|e| match e {
            AppError::NotFound(msg) => AppError::Unauthorized(msg),
            other => other,
        })?;

    Ok(StatusCode::NO_CONTENT)
}
