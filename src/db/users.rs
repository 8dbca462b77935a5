use chrono::{DateTime, Utc};

use super::Database;
use crate::constants::{ERR_EMAIL_TAKEN, ERR_REFRESH_TOKEN_MISSING};
use crate::error::{AppError, Result};
use crate::models::{User, UserResponse};
use crate::security::hash_password;

fn user_not_found(id: u32) -> AppError {
    AppError::NotFound(format!("User {} not found", id))
}

impl Database {
    /// Register a new user
    ///
    /// Fails with `Conflict` if the email is already registered. The password
    /// is hashed before the store is locked, so a conflicting request still
    /// pays for one hash.
    pub fn create_user(&self, email: &str, password: &str) -> Result<UserResponse> {
        let password_hash = hash_password(password)?;

        let response = self.update(|doc| {
            if doc.emails.contains_key(email) {
                tracing::warn!("Registration attempt for an existing email");
                return Err(AppError::Conflict(ERR_EMAIL_TAKEN.to_string()));
            }

            let id = doc.next_user_id();
            let user = User {
                id,
                email: email.to_string(),
                password: password_hash,
                refresh_token: None,
                refresh_token_expires_at: None,
                is_chirpy_red: false,
            };
            let response = UserResponse::from(&user);

            doc.emails.insert(email.to_string(), id);
            doc.users.insert(id, user);
            Ok(response)
        })?;

        tracing::info!("New user registered: {}", response.id);
        Ok(response)
    }

    /// Change a user's email and password
    ///
    /// The old email index entry is removed and the new one inserted in the
    /// same write. Keeping one's own email is not a conflict.
    pub fn update_user(&self, email: &str, password: &str, user_id: u32) -> Result<UserResponse> {
        let password_hash = hash_password(password)?;

        self.update(|doc| {
            if let Some(&owner) = doc.emails.get(email) {
                if owner != user_id {
                    tracing::warn!("User {} tried to take an email in use", user_id);
                    return Err(AppError::Conflict(ERR_EMAIL_TAKEN.to_string()));
                }
            }

            let user = doc
                .users
                .get_mut(&user_id)
                .ok_or_else(|| user_not_found(user_id))?;
            let old_email = std::mem::replace(&mut user.email, email.to_string());
            user.password = password_hash;
            let response = UserResponse::from(&*user);

            doc.emails.remove(&old_email);
            doc.emails.insert(email.to_string(), user_id);
            Ok(response)
        })
    }

    /// Upgrade a user's subscription (idempotent, never downgrades)
    pub fn update_subscription(&self, user_id: u32) -> Result<()> {
        self.update(|doc| {
            let user = doc
                .users
                .get_mut(&user_id)
                .ok_or_else(|| user_not_found(user_id))?;
            user.is_chirpy_red = true;
            Ok(())
        })?;

        tracing::info!("User {} upgraded", user_id);
        Ok(())
    }

    /// Overwrite a user's refresh token and its expiry
    pub fn set_refresh_token(
        &self,
        user_id: u32,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.update(|doc| {
            let user = doc
                .users
                .get_mut(&user_id)
                .ok_or_else(|| user_not_found(user_id))?;
            user.refresh_token = Some(token.to_string());
            user.refresh_token_expires_at = Some(expires_at);
            Ok(())
        })
    }

    /// Clear the refresh token of the first user holding `token`
    pub fn revoke_refresh_token(&self, token: &str) -> Result<()> {
        self.update(|doc| {
            let user = doc
                .users
                .values_mut()
                .find(|u| u.holds_refresh_token(token))
                .ok_or_else(|| AppError::NotFound(ERR_REFRESH_TOKEN_MISSING.to_string()))?;
            user.refresh_token = None;
            user.refresh_token_expires_at = None;
            Ok(())
        })
    }

    pub fn get_user(&self, user_id: u32) -> Result<User> {
        self.read(|doc| {
            doc.users
                .get(&user_id)
                .cloned()
                .ok_or_else(|| user_not_found(user_id))
        })
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.read(|doc| Ok(doc.user_by_email(email).cloned()))
    }

    pub fn find_user_by_refresh_token(&self, token: &str) -> Result<Option<User>> {
        self.read(|doc| Ok(doc.user_by_refresh_token(token).cloned()))
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.read(|doc| Ok(doc.users.values().cloned().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;
    use crate::security::verify_password;
    use chrono::Duration;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    fn open_temp(temp_dir: &TempDir) -> Database {
        Database::open(temp_dir.path().join("database.json")).unwrap()
    }

    /// The email index must be an exact mirror of the users' emails
    fn assert_index_consistent(doc: &Document) {
        let expected: BTreeMap<String, u32> = doc
            .users
            .values()
            .map(|u| (u.email.clone(), u.id))
            .collect();
        assert_eq!(doc.emails, expected);
    }

    #[test]
    fn test_create_user_assigns_sequential_ids() {
        let temp_dir = TempDir::new().unwrap();
        let db = open_temp(&temp_dir);

        let first = db.create_user("a@x.com", "pw").unwrap();
        let second = db.create_user("b@x.com", "pw").unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(first.email, "a@x.com");
        assert!(!first.is_chirpy_red);
        assert_eq!(second.id, 2);
        assert_index_consistent(&db.load().unwrap());
    }

    #[test]
    fn test_create_user_stores_only_a_digest() {
        let temp_dir = TempDir::new().unwrap();
        let db = open_temp(&temp_dir);

        db.create_user("a@x.com", "hunter2").unwrap();
        let user = db.get_user(1).unwrap();

        assert_ne!(user.password, "hunter2");
        assert!(verify_password(&user.password, "hunter2"));
        assert!(!fs::read_to_string(db.path()).unwrap().contains("hunter2"));
    }

    #[test]
    fn test_create_duplicate_email_is_conflict_and_leaves_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let db = open_temp(&temp_dir);
        db.create_user("a@x.com", "pw").unwrap();
        let before = fs::read(db.path()).unwrap();

        let result = db.create_user("a@x.com", "other");

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(fs::read(db.path()).unwrap(), before);
    }

    #[test]
    fn test_update_user_moves_email_index() {
        let temp_dir = TempDir::new().unwrap();
        let db = open_temp(&temp_dir);
        db.create_user("a@x.com", "old").unwrap();

        let updated = db.update_user("new@x.com", "new", 1).unwrap();
        assert_eq!(updated.id, 1);
        assert_eq!(updated.email, "new@x.com");

        let doc = db.load().unwrap();
        assert!(!doc.emails.contains_key("a@x.com"));
        assert_eq!(doc.emails.get("new@x.com"), Some(&1));
        assert_index_consistent(&doc);

        let user = db.get_user(1).unwrap();
        assert!(verify_password(&user.password, "new"));
        assert!(!verify_password(&user.password, "old"));
    }

    #[test]
    fn test_update_user_to_taken_email_is_conflict() {
        let temp_dir = TempDir::new().unwrap();
        let db = open_temp(&temp_dir);
        db.create_user("a@x.com", "pw").unwrap();
        db.create_user("b@x.com", "pw").unwrap();

        let result = db.update_user("b@x.com", "pw", 1);
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let doc = db.load().unwrap();
        assert_eq!(doc.emails.len(), 2);
        assert_eq!(doc.users[&1].email, "a@x.com");
        assert_index_consistent(&doc);
    }

    #[test]
    fn test_update_user_keeping_own_email() {
        let temp_dir = TempDir::new().unwrap();
        let db = open_temp(&temp_dir);
        db.create_user("a@x.com", "pw").unwrap();

        let updated = db.update_user("a@x.com", "changed", 1).unwrap();
        assert_eq!(updated.email, "a@x.com");
        assert_index_consistent(&db.load().unwrap());
    }

    #[test]
    fn test_update_unknown_user_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let db = open_temp(&temp_dir);

        let result = db.update_user("a@x.com", "pw", 42);
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(db.load().unwrap().emails.is_empty());
    }

    #[test]
    fn test_update_subscription() {
        let temp_dir = TempDir::new().unwrap();
        let db = open_temp(&temp_dir);
        db.create_user("a@x.com", "pw").unwrap();

        db.update_subscription(1).unwrap();
        // Second upgrade is a no-op, not an error
        db.update_subscription(1).unwrap();

        assert!(db.get_user(1).unwrap().is_chirpy_red);
        assert!(matches!(
            db.update_subscription(2),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_set_and_revoke_refresh_token() {
        let temp_dir = TempDir::new().unwrap();
        let db = open_temp(&temp_dir);
        db.create_user("a@x.com", "pw").unwrap();
        let expires_at = Utc::now() + Duration::hours(1);

        db.set_refresh_token(1, "tok", expires_at).unwrap();
        let user = db.find_user_by_refresh_token("tok").unwrap().unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.refresh_token_expires_at, Some(expires_at));

        db.revoke_refresh_token("tok").unwrap();
        let user = db.get_user(1).unwrap();
        assert!(user.refresh_token.is_none());
        assert!(user.refresh_token_expires_at.is_none());
        assert!(db.find_user_by_refresh_token("tok").unwrap().is_none());
    }

    #[test]
    fn test_set_refresh_token_overwrites_previous() {
        let temp_dir = TempDir::new().unwrap();
        let db = open_temp(&temp_dir);
        db.create_user("a@x.com", "pw").unwrap();
        let expires_at = Utc::now() + Duration::hours(1);

        db.set_refresh_token(1, "first", expires_at).unwrap();
        db.set_refresh_token(1, "second", expires_at).unwrap();

        assert!(db.find_user_by_refresh_token("first").unwrap().is_none());
        assert!(db.find_user_by_refresh_token("second").unwrap().is_some());
    }

    #[test]
    fn test_revoke_unknown_token_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let db = open_temp(&temp_dir);
        db.create_user("a@x.com", "pw").unwrap();

        let result = db.revoke_refresh_token("missing");
        assert!(
            matches!(result, Err(AppError::NotFound(ref msg)) if msg == ERR_REFRESH_TOKEN_MISSING)
        );
        // An empty token never matches a user without one
        assert!(matches!(
            db.revoke_refresh_token(""),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_find_user_by_email() {
        let temp_dir = TempDir::new().unwrap();
        let db = open_temp(&temp_dir);
        db.create_user("a@x.com", "pw").unwrap();

        assert_eq!(db.find_user_by_email("a@x.com").unwrap().unwrap().id, 1);
        assert!(db.find_user_by_email("b@x.com").unwrap().is_none());
    }

    #[test]
    fn test_list_users() {
        let temp_dir = TempDir::new().unwrap();
        let db = open_temp(&temp_dir);
        db.create_user("a@x.com", "pw").unwrap();
        db.create_user("b@x.com", "pw").unwrap();

        let mut emails: Vec<String> = db
            .list_users()
            .unwrap()
            .into_iter()
            .map(|u| u.email)
            .collect();
        emails.sort();
        assert_eq!(emails, vec!["a@x.com", "b@x.com"]);
    }
}
