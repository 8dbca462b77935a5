pub mod chirp;
pub mod document;
pub mod user;

pub use chirp::Chirp;
pub use document::Document;
pub use user::{User, UserResponse};
