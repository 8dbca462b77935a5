use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;

use crate::constants::EVENT_USER_UPGRADED;
use crate::error::{AppError, Result};
use crate::routes::api_key;
use crate::security::constant_time_equal;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    pub event: String,
    #[serde(default)]
    pub data: WebhookData,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub user_id: u32,
}

/// Billing webhook
///
/// Only `user.upgraded` changes anything; other events are acknowledged
/// with 204 so the sender stops retrying.
pub async fn polka_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<WebhookRequest>,
) -> Result<StatusCode> {
    let key = api_key(&headers)?;
    if !constant_time_equal(key.as_bytes(), state.config.polka_key.as_bytes()) {
        tracing::warn!("Webhook called with an invalid API key");
        return Err(AppError::Unauthorized("Invalid API key".to_string()));
    }

    if payload.event != EVENT_USER_UPGRADED {
        tracing::debug!("Ignoring webhook event: {}", payload.event);
        return Ok(StatusCode::NO_CONTENT);
    }

    let db = state.db.clone();
    let user_id = payload.data.user_id;
    tokio::task::spawn_blocking(move || db.update_subscription(user_id)).await??;

    Ok(StatusCode::NO_CONTENT)
}
