use axum::http::{header, HeaderMap};

use crate::constants::{
    ERR_CHIRP_TOO_LONG, ERR_MISSING_AUTH, MAX_CHIRP_LENGTH, PROFANE_WORDS, PROFANITY_MASK,
};
use crate::error::AppError;

/// Error type for Authorization header parsing (constrained to only possible errors)
#[derive(Debug, PartialEq)]
pub enum AuthHeaderError {
    Missing,
    WrongScheme,
}

impl From<AuthHeaderError> for AppError {
    fn from(err: AuthHeaderError) -> Self {
        match err {
            AuthHeaderError::Missing => AppError::Unauthorized(ERR_MISSING_AUTH.to_string()),
            AuthHeaderError::WrongScheme => {
                AppError::Unauthorized("Malformed authorization header".to_string())
            }
        }
    }
}

/// Extract the credential from `Authorization: <scheme> <credential>`
fn authorization_credential<'a>(
    headers: &'a HeaderMap,
    scheme: &str,
) -> Result<&'a str, AuthHeaderError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthHeaderError::Missing)?;

    let credential = value
        .strip_prefix(scheme)
        .and_then(|rest| rest.strip_prefix(' '))
        .map(str::trim)
        .ok_or(AuthHeaderError::WrongScheme)?;

    if credential.is_empty() {
        return Err(AuthHeaderError::Missing);
    }

    Ok(credential)
}

/// Session or refresh token from a `Bearer` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthHeaderError> {
    authorization_credential(headers, "Bearer")
}

/// Webhook key from an `ApiKey` header
pub fn api_key(headers: &HeaderMap) -> Result<&str, AuthHeaderError> {
    authorization_credential(headers, "ApiKey")
}

/// Validate a chirp body and mask profane words
///
/// Words are split on single spaces and compared case-insensitively;
/// punctuation attached to a word keeps it from matching.
pub fn clean_chirp_body(body: &str) -> Result<String, AppError> {
    if body.chars().count() > MAX_CHIRP_LENGTH {
        return Err(AppError::InvalidInput(ERR_CHIRP_TOO_LONG.to_string()));
    }

    let cleaned = body
        .split(' ')
        .map(|word| {
            if PROFANE_WORDS.contains(&word.to_lowercase().as_str()) {
                PROFANITY_MASK
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    Ok(cleaned)
}
