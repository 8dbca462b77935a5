use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::Chirp;
use crate::routes::{bearer_token, clean_chirp_body};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateChirpRequest {
    pub body: String,
}

/// Post a chirp as the authenticated user
///
/// The body is length-checked and profanity-masked before it is stored.
pub async fn create_chirp(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateChirpRequest>,
) -> Result<(StatusCode, Json<Chirp>)> {
    let author_id = state.tokens.verify_access_token(bearer_token(&headers)?)?;
    let body = clean_chirp_body(&payload.body)?;

    let db = state.db.clone();
    let chirp = tokio::task::spawn_blocking(move || db.create_chirp(&body, author_id)).await??;

    Ok((StatusCode::CREATED, Json(chirp)))
}

/// List all chirps in ascending ID order
pub async fn list_chirps(State(state): State<AppState>) -> Result<Json<Vec<Chirp>>> {
    let db = state.db.clone();
    let chirps = tokio::task::spawn_blocking(move || db.list_chirps()).await??;

    Ok(Json(chirps))
}

pub async fn get_chirp(
    State(state): State<AppState>,
    Path(chirp_id): Path<u32>,
) -> Result<Json<Chirp>> {
    let db = state.db.clone();
    let chirp = tokio::task::spawn_blocking(move || db.get_chirp(chirp_id))
        .await??
        .ok_or_else(|| AppError::NotFound("The chirp does not exist".to_string()))?;

    Ok(Json(chirp))
}

/// Delete one of the authenticated user's chirps
///
/// Returns 403 for someone else's chirp and 204 otherwise, including when
/// the chirp is already gone.
pub async fn delete_chirp(
    State(state): State<AppState>,
    Path(chirp_id): Path<u32>,
    headers: HeaderMap,
) -> Result<StatusCode> {
    let requester_id = state.tokens.verify_access_token(bearer_token(&headers)?)?;

    let db = state.db.clone();
    tokio::task::spawn_blocking(move || db.delete_chirp(requester_id, chirp_id)).await??;

    Ok(StatusCode::NO_CONTENT)
}
