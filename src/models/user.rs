use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::security::constant_time_equal;

/// User record stored in the database document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Numeric user ID, assigned on creation
    pub id: u32,
    /// Unique email address
    pub email: String,
    /// Argon2 PHC digest of the password
    pub password: String,
    /// Opaque refresh token, absent when none is issued
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_token: Option<String>,
    /// When the refresh token stops being accepted
    ///
    /// Older documents store this as `exp`, an RFC 3339 string that is empty
    /// when no token was issued.
    #[serde(
        default,
        alias = "exp",
        deserialize_with = "rfc3339_or_blank",
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    /// Set by the billing webhook, never cleared
    #[serde(default)]
    pub is_chirpy_red: bool,
}

impl User {
    /// Whether this user currently holds exactly `token`
    pub fn holds_refresh_token(&self, token: &str) -> bool {
        match self.refresh_token.as_deref() {
            Some(held) => {
                !token.is_empty() && constant_time_equal(held.as_bytes(), token.as_bytes())
            }
            None => false,
        }
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

fn rfc3339_or_blank<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match blank_as_none(deserializer)? {
        Some(value) => DateTime::parse_from_rfc3339(&value)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// User model for API responses (no password or tokens)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: u32,
    pub email: String,
    pub is_chirpy_red: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            is_chirpy_red: user.is_chirpy_red,
        }
    }
}
