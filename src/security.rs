use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::constants::{
    ACCESS_TOKEN_MAX_SECS, ERR_BAD_CREDENTIALS, ERR_INVALID_TOKEN, ERR_REFRESH_TOKEN_EXPIRED,
    ERR_REFRESH_TOKEN_MISSING, REFRESH_TOKEN_BYTES, REFRESH_TOKEN_TTL_HOURS, TOKEN_ISSUER,
};
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::User;

// =============================================================================
// Passwords
// =============================================================================

/// Hash a password with Argon2id and a random salt
///
/// Returns the PHC string (algorithm, parameters, salt and hash together).
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::HashFailure(e.to_string()))
}

/// Check a password against a stored digest
///
/// A malformed digest is treated as a mismatch.
pub fn verify_password(digest: &str, password: &str) -> bool {
    let parsed = match PasswordHash::new(digest) {
        Ok(hash) => hash,
        Err(_) => {
            tracing::warn!("Stored password digest is malformed");
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// =============================================================================
// Secret Comparison
// =============================================================================

/// Compare two secrets in constant time
///
/// Only the length is allowed to short-circuit.
pub fn constant_time_equal(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

// =============================================================================
// Refresh Tokens
// =============================================================================

/// Generate an opaque refresh token: 32 random bytes, hex encoded
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Absolute expiry for a refresh token issued at `now`
pub fn refresh_token_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::hours(REFRESH_TOKEN_TTL_HOURS)
}

// =============================================================================
// Session Tokens
// =============================================================================

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    /// User ID as a decimal string
    pub sub: String,
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
    pub refresh_token: String,
}

/// Clamp a requested lifetime to `(0, ACCESS_TOKEN_MAX_SECS]`
///
/// Zero, absent and over-long requests all get the ceiling.
pub fn access_token_lifetime(requested_secs: Option<u64>) -> u64 {
    match requested_secs {
        Some(secs) if secs > 0 && secs <= ACCESS_TOKEN_MAX_SECS => secs,
        _ => ACCESS_TOKEN_MAX_SECS,
    }
}

/// Issues and checks credentials with the process-wide signing secret
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Sign a session token for `user_id`
    pub fn issue_access_token(&self, user_id: u32, expires_in_secs: Option<u64>) -> Result<String> {
        let now = Utc::now();
        let lifetime = access_token_lifetime(expires_in_secs) as i64;

        let claims = Claims {
            iss: TOKEN_ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(lifetime)).timestamp(),
            sub: user_id.to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(AppError::TokenSigning)
    }

    /// Check signature, issuer and expiry, returning the subject user ID
    pub fn verify_access_token(&self, token: &str) -> Result<u32> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::debug!("Session token rejected: {}", e);
            AppError::Unauthorized(ERR_INVALID_TOKEN.to_string())
        })?;

        data.claims
            .sub
            .parse()
            .map_err(|_| AppError::Unauthorized(ERR_INVALID_TOKEN.to_string()))
    }

    /// Check email and password, then issue a session and a fresh refresh token
    ///
    /// Unknown email and wrong password fail identically.
    pub fn login(
        &self,
        db: &Database,
        email: &str,
        password: &str,
        expires_in_secs: Option<u64>,
    ) -> Result<Session> {
        let user = db
            .find_user_by_email(email)?
            .filter(|user| verify_password(&user.password, password))
            .ok_or_else(|| {
                tracing::warn!("Failed login attempt");
                AppError::Unauthorized(ERR_BAD_CREDENTIALS.to_string())
            })?;

        let token = self.issue_access_token(user.id, expires_in_secs)?;
        let refresh_token = generate_refresh_token();
        db.set_refresh_token(user.id, &refresh_token, refresh_token_expiry(Utc::now()))?;

        tracing::info!("User {} logged in", user.id);
        Ok(Session {
            user,
            token,
            refresh_token,
        })
    }

    /// Mint a new session token from a stored refresh token
    ///
    /// The refresh token itself is not rotated.
    pub fn refresh(&self, db: &Database, refresh_token: &str) -> Result<String> {
        let user = db
            .find_user_by_refresh_token(refresh_token)?
            .ok_or_else(|| AppError::Unauthorized(ERR_REFRESH_TOKEN_MISSING.to_string()))?;

        let expired = user
            .refresh_token_expires_at
            .map_or(true, |expires_at| Utc::now() > expires_at);
        if expired {
            tracing::warn!("Expired refresh token presented for user {}", user.id);
            return Err(AppError::Unauthorized(ERR_REFRESH_TOKEN_EXPIRED.to_string()));
        }

        self.issue_access_token(user.id, None)
    }

    /// Revoke a refresh token; unknown tokens fail with `NotFound`
    pub fn revoke(&self, db: &Database, refresh_token: &str) -> Result<()> {
        db.revoke_refresh_token(refresh_token)
    }
}
