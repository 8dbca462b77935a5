//! Chirpy Server Library
//!
//! File-backed JSON store, credential handling and the HTTP routes on top.
//! Exported here for testing and reuse.

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod security;

pub use config::Config;
pub use db::{open_database, Database, Db};
pub use error::{AppError, Result};
pub use security::TokenIssuer;

use axum::{
    routing::{get, post},
    Router,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Config,
    pub tokens: TokenIssuer,
}

impl AppState {
    /// Create a new AppState; the signing key comes from `config.jwt_secret`
    pub fn new(db: Db, config: Config) -> Self {
        let tokens = TokenIssuer::new(&config.jwt_secret);
        Self { db, config, tokens }
    }
}

/// Build the API router (without middleware layers)
pub fn build_router(state: AppState) -> Router {
    use routes::*;

    Router::new()
        .route("/api/healthz", get(health_check))
        .route("/api/users", post(create_user).put(update_user))
        .route("/api/login", post(login))
        .route("/api/refresh", post(refresh))
        .route("/api/revoke", post(revoke))
        .route("/api/chirps", post(create_chirp).get(list_chirps))
        .route("/api/chirps/:chirp_id", get(get_chirp).delete(delete_chirp))
        .route("/api/polka/webhooks", post(polka_webhook))
        .with_state(state)
}
