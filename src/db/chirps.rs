use super::Database;
use crate::error::{AppError, Result};
use crate::models::Chirp;

impl Database {
    /// Store a chirp; the body must already be validated
    pub fn create_chirp(&self, body: &str, author_id: u32) -> Result<Chirp> {
        let chirp = self.update(|doc| {
            let id = doc.next_chirp_id();
            let chirp = Chirp {
                id,
                body: body.to_string(),
                author_id,
            };
            doc.chirps.insert(id, chirp.clone());
            Ok(chirp)
        })?;

        tracing::info!("Chirp {} created by user {}", chirp.id, author_id);
        Ok(chirp)
    }

    /// Delete a chirp on behalf of `requester_id`
    ///
    /// Only the author may delete. A chirp that does not exist is treated as
    /// already deleted and succeeds without changes.
    pub fn delete_chirp(&self, requester_id: u32, chirp_id: u32) -> Result<()> {
        self.update(|doc| {
            let Some(chirp) = doc.chirps.get(&chirp_id) else {
                return Ok(());
            };

            if chirp.author_id != requester_id {
                tracing::warn!(
                    "User {} tried to delete chirp {} owned by {}",
                    requester_id,
                    chirp_id,
                    chirp.author_id
                );
                return Err(AppError::Forbidden);
            }

            doc.chirps.remove(&chirp_id);
            Ok(())
        })
    }

    pub fn get_chirp(&self, chirp_id: u32) -> Result<Option<Chirp>> {
        self.read(|doc| Ok(doc.chirps.get(&chirp_id).cloned()))
    }

    /// All chirps in ascending ID order
    pub fn list_chirps(&self) -> Result<Vec<Chirp>> {
        self.read(|doc| Ok(doc.chirps.values().cloned().collect()))
    }
}
