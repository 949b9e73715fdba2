//! File-backed document store.
//!
//! One JSON file per key. Writes go to a temporary file that is renamed
//! over the target, so readers never observe a half-written document.
//!
//! The version check and the rename happen while holding `<key>.json.lock`,
//! created with `create_new`, so processes sharing a data directory cannot
//! interleave their check-and-write. A lock older than [`STALE_LOCK`] is
//! treated as left behind by a crashed writer and removed.

use super::{content_version, DocumentStore, Precondition, StoreError, StoredDocument};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Age after which a lock file is considered abandoned.
pub const STALE_LOCK: Duration = Duration::from_secs(30);

const LOCK_RETRY: Duration = Duration::from_millis(25);
const LOCK_ATTEMPTS: usize = 200;

/// Exclusive lock on one document, released on drop.
struct LockFile {
    path: PathBuf,
}

impl LockFile {
    async fn acquire(path: PathBuf) -> Result<Self, StoreError> {
        for _ in 0..LOCK_ATTEMPTS {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if Self::is_stale(&path).await {
                        warn!("Removing stale lock {}", path.display());
                        let _ = fs::remove_file(&path).await;
                        continue;
                    }
                    tokio::time::sleep(LOCK_RETRY).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(StoreError::Io(std::io::Error::new(
            ErrorKind::WouldBlock,
            format!("timed out waiting for {}", path.display()),
        )))
    }

    async fn is_stale(path: &Path) -> bool {
        let Ok(meta) = fs::metadata(path).await else {
            return false;
        };
        meta.modified()
            .ok()
            .and_then(|m| m.elapsed().ok())
            .is_some_and(|age| age > STALE_LOCK)
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Document store writing each key to `<dir>/<key>.json`.
pub struct FileDocumentStore {
    dir: PathBuf,
    /// Serializes writers within this process before they contend on the lock file.
    write_lock: Mutex<()>,
}

impl FileDocumentStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        info!("File document store at {}", dir.display());
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the file path for a key.
    fn get_path(&self, key: &str) -> PathBuf {
        // Sanitize key for filesystem
        let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_");
        self.dir.join(format!("{}.json", safe_key))
    }

    async fn read_current(path: &Path) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(path).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn load(&self, key: &str) -> Result<Option<StoredDocument>, StoreError> {
        let path = self.get_path(key);
        Ok(Self::read_current(&path).await?.map(StoredDocument::new))
    }

    async fn save(
        &self,
        key: &str,
        body: String,
        precondition: Precondition,
    ) -> Result<String, StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.get_path(key);
        let _lock = LockFile::acquire(path.with_extension("json.lock")).await?;

        let current = Self::read_current(&path).await?.map(|b| content_version(&b));
        if !precondition.holds(current.as_deref()) {
            return Err(StoreError::Conflict {
                key: key.to_string(),
            });
        }

        let tmp = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4()));
        fs::write(&tmp, body.as_bytes()).await?;
        fs::rename(&tmp, &path).await?;

        let version = content_version(&body);
        debug!("Wrote {} ({} bytes)", path.display(), body.len());
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("omen_file_store_{}_{}", name, uuid::Uuid::new_v4()))
    }

    async fn cleanup(store: &FileDocumentStore) {
        let _ = fs::remove_dir_all(store.dir()).await;
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let store = FileDocumentStore::open(test_dir("round_trip")).await.unwrap();

        assert!(store.load("learning").await.unwrap().is_none());
        let version = store
            .save("learning", "{\"signals\":[]}".to_string(), Precondition::Absent)
            .await
            .unwrap();

        let doc = store.load("learning").await.unwrap().unwrap();
        assert_eq!(doc.body, "{\"signals\":[]}");
        assert_eq!(doc.version, version);
        cleanup(&store).await;
    }

    #[tokio::test]
    async fn test_file_store_conflict_leaves_file_untouched() {
        let store = FileDocumentStore::open(test_dir("conflict")).await.unwrap();
        let v1 = store
            .save("doc", "one".to_string(), Precondition::Absent)
            .await
            .unwrap();
        store
            .save("doc", "two".to_string(), Precondition::Version(v1.clone()))
            .await
            .unwrap();

        let err = store
            .save("doc", "three".to_string(), Precondition::Version(v1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.load("doc").await.unwrap().unwrap().body, "two");
        cleanup(&store).await;
    }

    #[tokio::test]
    async fn test_writers_sharing_a_directory_conflict() {
        let dir = test_dir("two_writers");
        let first = FileDocumentStore::open(&dir).await.unwrap();
        let second = FileDocumentStore::open(&dir).await.unwrap();
        let v1 = first
            .save("doc", "one".to_string(), Precondition::Absent)
            .await
            .unwrap();

        // Separate store values share no in-process mutex; only one of the two can win.
        let (a, b) = tokio::join!(
            first.save("doc", "from first".to_string(), Precondition::Version(v1.clone())),
            second.save("doc", "from second".to_string(), Precondition::Version(v1)),
        );
        assert!(a.is_ok() != b.is_ok());
        let err = a.err().or(b.err()).unwrap();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert!(!dir.join("doc.json.lock").exists());
        cleanup(&first).await;
    }

    #[tokio::test]
    async fn test_held_lock_blocks_until_released() {
        let store = FileDocumentStore::open(test_dir("held_lock")).await.unwrap();
        let lock_path = store.dir().join("doc.json.lock");
        let lock = LockFile::acquire(lock_path.clone()).await.unwrap();

        let saving = store.save("doc", "body".to_string(), Precondition::Absent);
        let release = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            assert!(!store.dir().join("doc.json").exists());
            drop(lock);
        };
        let (saved, ()) = tokio::join!(saving, release);
        saved.unwrap();
        assert!(!lock_path.exists());
        cleanup(&store).await;
    }

    #[tokio::test]
    async fn test_file_store_sanitizes_keys() {
        let store = FileDocumentStore::open(test_dir("sanitize")).await.unwrap();
        store
            .save("btc:learning/v1", "{}".to_string(), Precondition::None)
            .await
            .unwrap();
        assert!(store.dir().join("btc_learning_v1.json").exists());
        cleanup(&store).await;
    }
}
