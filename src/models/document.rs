use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Chirp, User};

/// The whole persisted state, read and written as one JSON document
///
/// `emails` is a secondary index over `users` and must always hold exactly
/// one `email -> id` entry per user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub chirps: BTreeMap<u32, Chirp>,
    pub users: BTreeMap<u32, User>,
    pub emails: BTreeMap<String, u32>,
    /// Highest user ID ever handed out
    #[serde(default)]
    pub last_user_id: u32,
    /// Highest chirp ID ever handed out
    #[serde(default)]
    pub last_chirp_id: u32,
}

impl Document {
    /// Reserve the next user ID
    pub fn next_user_id(&mut self) -> u32 {
        let largest = self.users.keys().next_back().copied().unwrap_or(0);
        self.last_user_id = self.last_user_id.max(largest) + 1;
        self.last_user_id
    }

    /// Reserve the next chirp ID; deleted IDs are never handed out again
    pub fn next_chirp_id(&mut self) -> u32 {
        let largest = self.chirps.keys().next_back().copied().unwrap_or(0);
        self.last_chirp_id = self.last_chirp_id.max(largest) + 1;
        self.last_chirp_id
    }

    /// Look up a user through the email index
    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.emails.get(email).and_then(|id| self.users.get(id))
    }

    /// First user (by ID) holding this refresh token
    pub fn user_by_refresh_token(&self, token: &str) -> Option<&User> {
        self.users.values().find(|u| u.holds_refresh_token(token))
    }
}
