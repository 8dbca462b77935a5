pub mod chirps;
pub mod users;

use parking_lot::RwLock;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::Document;

/// Database handle type (Arc-wrapped for sharing across handlers)
pub type Db = Arc<Database>;

/// JSON document store backed by a single file
///
/// Every call re-reads the file; nothing is cached between calls.
/// `load` holds the shared lock and `save` the exclusive one, so a reader
/// never sees a half-written file. Mutations should go through [`Database::update`],
/// which keeps the exclusive lock across the whole load, mutate and save.
#[derive(Debug)]
pub struct Database {
    path: PathBuf,
    lock: RwLock<()>,
}

/// Open or create the database document at the given path
pub fn open_database(path: impl AsRef<Path>) -> Result<Db> {
    Database::open(path).map(Arc::new)
}

impl Database {
    /// Open the store, writing an empty document first if the file is absent
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        tracing::info!("Opening database at: {:?}", path);

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    tracing::error!("Failed to create database directory: {}", e);
                    e
                })?;
            }
        }

        let db = Self {
            path,
            lock: RwLock::new(()),
        };

        if !db.path.exists() {
            db.save(&Document::default())?;
            tracing::info!("Database initialized successfully");
        }

        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and decode the whole document under the shared lock
    pub fn load(&self) -> Result<Document> {
        let _guard = self.lock.read();
        self.read_file()
    }

    /// Encode and replace the whole document under the exclusive lock
    pub fn save(&self, doc: &Document) -> Result<()> {
        let _guard = self.lock.write();
        self.write_file(doc)
    }

    /// Run a read-only query against a fresh snapshot
    pub fn read<T>(&self, f: impl FnOnce(&Document) -> Result<T>) -> Result<T> {
        let _guard = self.lock.read();
        let doc = self.read_file()?;
        f(&doc)
    }

    /// Load, mutate and save as one critical section
    ///
    /// Nothing is written if `f` returns an error.
    pub fn update<T>(&self, f: impl FnOnce(&mut Document) -> Result<T>) -> Result<T> {
        let _guard = self.lock.write();
        let mut doc = self.read_file()?;
        let out = f(&mut doc)?;
        self.write_file(&doc)?;
        Ok(out)
    }

    fn read_file(&self) -> Result<Document> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AppError::NotFound(format!(
                    "Database file {} does not exist",
                    self.path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(serde_json::from_slice(&bytes)?)
    }

    // Write-then-rename so a failed write never clobbers the previous document
    fn write_file(&self, doc: &Document) -> Result<()> {
        let bytes = serde_json::to_vec(doc)?;
        let temp_path = self.temp_path();

        let mut file = create_private(&temp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, &self.path)?;

        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

/// Create a file readable and writable by the owner only
#[cfg(unix)]
fn create_private(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chirp;
    use std::thread;
    use tempfile::TempDir;

    fn open_temp(temp_dir: &TempDir) -> Database {
        Database::open(temp_dir.path().join("database.json")).unwrap()
    }

    #[test]
    fn test_open_creates_empty_document() {
        let temp_dir = TempDir::new().unwrap();
        let db = open_temp(&temp_dir);

        let raw = fs::read_to_string(db.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(json["chirps"].as_object().unwrap().is_empty());
        assert!(json["users"].as_object().unwrap().is_empty());
        assert!(json["emails"].as_object().unwrap().is_empty());

        assert_eq!(db.load().unwrap(), Document::default());
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("database.json");

        let db = Database::open(&path).unwrap();
        assert!(db.path().exists());
    }

    #[test]
    fn test_open_keeps_existing_document() {
        let temp_dir = TempDir::new().unwrap();
        let db = open_temp(&temp_dir);
        db.create_chirp("kept", 1).unwrap();

        let reopened = open_temp(&temp_dir);
        assert_eq!(reopened.list_chirps().unwrap().len(), 1);
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let db = open_temp(&temp_dir);
        fs::remove_file(db.path()).unwrap();

        assert!(matches!(db.load(), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_load_garbage_is_corrupt_data() {
        let temp_dir = TempDir::new().unwrap();
        let db = open_temp(&temp_dir);
        fs::write(db.path(), b"{not json").unwrap();

        assert!(matches!(db.load(), Err(AppError::CorruptData(_))));
    }

    #[test]
    fn test_save_replaces_content_and_cleans_up() {
        let temp_dir = TempDir::new().unwrap();
        let db = open_temp(&temp_dir);

        let mut doc = Document::default();
        doc.chirps.insert(
            1,
            Chirp {
                id: 1,
                body: "hello".to_string(),
                author_id: 1,
            },
        );
        db.save(&doc).unwrap();

        assert_eq!(db.load().unwrap(), doc);
        assert!(!db.temp_path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let db = open_temp(&temp_dir);

        let mode = fs::metadata(db.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_failed_update_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let db = open_temp(&temp_dir);
        let before = fs::read(db.path()).unwrap();

        let result: Result<()> = db.update(|doc| {
            doc.next_chirp_id();
            Err(AppError::Forbidden)
        });

        assert!(matches!(result, Err(AppError::Forbidden)));
        assert_eq!(fs::read(db.path()).unwrap(), before);
    }

    #[test]
    fn test_failed_save_keeps_previous_document() {
        let temp_dir = TempDir::new().unwrap();
        let db = open_temp(&temp_dir);
        db.create_chirp("kept", 1).unwrap();
        let before = fs::read(db.path()).unwrap();

        // A directory where the temp file belongs makes the write fail
        fs::create_dir(db.temp_path()).unwrap();

        let result = db.create_chirp("lost", 1);
        assert!(matches!(result, Err(AppError::Io(_))));
        assert_eq!(fs::read(db.path()).unwrap(), before);

        let chirps = db.list_chirps().unwrap();
        assert_eq!(chirps.len(), 1);
        assert_eq!(chirps[0].body, "kept");
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(open_temp(&temp_dir));

        let handles: Vec<_> = (0..8)
            .map(|author| {
                let db = db.clone();
                thread::spawn(move || {
                    for _ in 0..5 {
                        db.create_chirp("concurrent", author).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let chirps = db.list_chirps().unwrap();
        assert_eq!(chirps.len(), 40);
        let ids: Vec<u32> = chirps.iter().map(|c| c.id).collect();
        assert_eq!(ids, (1..=40).collect::<Vec<_>>());
    }
}
