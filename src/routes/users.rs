use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::UserResponse;
use crate::routes::bearer_token;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub email: String,
    pub password: String,
}

impl UserRequest {
    fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() {
            return Err(AppError::InvalidInput("Email is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(AppError::InvalidInput("Password is required".to_string()));
        }
        Ok(())
    }
}

/// Register a new user
///
/// Returns 409 Conflict if the email is already registered.
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<UserRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    payload.validate()?;

    let db = state.db.clone();
    let user =
        tokio::task::spawn_blocking(move || db.create_user(&payload.email, &payload.password))
            .await??;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Change the authenticated user's email and password
pub async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UserRequest>,
) -> Result<Json<UserResponse>> {
    let user_id = state.tokens.verify_access_token(bearer_token(&headers)?)?;
    payload.validate()?;

    let db = state.db.clone();
    let user = tokio::task::spawn_blocking(move || {
        db.update_user(&payload.email, &payload.password, user_id)
    })
    .await??;

    Ok(Json(user))
}
