pub mod auth;
pub mod chirps;
pub mod health;
pub mod polka;
pub mod users;
pub mod validation;

pub use auth::{login, refresh, revoke};
pub use chirps::{create_chirp, delete_chirp, get_chirp, list_chirps};
pub use health::health_check;
pub use polka::polka_webhook;
pub use users::{create_user, update_user};
pub use validation::{api_key, bearer_token, clean_chirp_body};
