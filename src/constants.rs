/// Maximum chirp length in characters
pub const MAX_CHIRP_LENGTH: usize = 140;

/// Words masked out of chirp bodies before storage
pub const PROFANE_WORDS: [&str; 3] = ["kerfuffle", "sharbert", "fornax"];

/// Replacement for a masked word
pub const PROFANITY_MASK: &str = "****";

/// Issuer claim stamped on every session token
pub const TOKEN_ISSUER: &str = "chirpy";

/// Ceiling for session token lifetime (1 hour)
/// Requests for zero or anything longer get this value
pub const ACCESS_TOKEN_MAX_SECS: u64 = 3600;

/// Refresh token lifetime (60 days)
pub const REFRESH_TOKEN_TTL_HOURS: i64 = 1440;

/// Random bytes in a refresh token before hex encoding
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Webhook event that upgrades an account
pub const EVENT_USER_UPGRADED: &str = "user.upgraded";

// =============================================================================
// Error Messages
// =============================================================================

/// Error message for a duplicate email on create or update
pub const ERR_EMAIL_TAKEN: &str = "Email already exists";

/// Error message for a failed login; never says which field was wrong
pub const ERR_BAD_CREDENTIALS: &str = "Incorrect email or password";

/// Error message when no user owns a refresh token
pub const ERR_REFRESH_TOKEN_MISSING: &str = "Refresh token does not exist";

/// Error message for a refresh token past its expiry
pub const ERR_REFRESH_TOKEN_EXPIRED: &str = "Refresh token has expired";

/// Error message for a bad or expired session token
pub const ERR_INVALID_TOKEN: &str = "Invalid token";

/// Error message for a missing or malformed Authorization header
pub const ERR_MISSING_AUTH: &str = "Authorization header required";

/// Error message for an over-long chirp
pub const ERR_CHIRP_TOO_LONG: &str = "Chirp is too long";
