use serde::{Deserialize, Serialize};

/// A short post, stored and returned as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chirp {
    pub id: u32,
    /// Already validated and masked by the caller
    pub body: String,
    pub author_id: u32,
}
