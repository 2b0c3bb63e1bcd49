use async_trait::async_trait;
use crate::history::{ BlobStore, StoreError };
use log::debug;
use sha2::{ Digest, Sha256 };
use std::io::ErrorKind;
use std::path::{ Path, PathBuf };
use std::sync::atomic::{ AtomicU64, Ordering };
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// One JSON file per key under `root`.
///
/// File names are the hex SHA-256 of the key, so any user identifier maps to
/// a safe, fixed-length name. Writes land in a temp file first and are
/// renamed over the target once synced.
pub struct FileBlobStore {
    root: PathBuf,
    write_seq: AtomicU64,
}

impl FileBlobStore {
    pub fn new(root: PathBuf) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root, write_seq: AtomicU64::new(0) })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.root.join(format!("{}.json", hex::encode(digest)))
    }

    fn temp_path_for(&self, target: &Path) -> PathBuf {
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let mut name = target.as_os_str().to_owned();
        name.push(format!(".{}.{}.tmp", std::process::id(), seq));
        PathBuf::from(name)
    }
}

/// Removes a temp file on drop unless it was renamed into place, so failed or
/// cancelled writes leave nothing behind.
struct PendingTemp {
    path: PathBuf,
    armed: bool,
}

impl PendingTemp {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn persisted(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingTemp {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != ErrorKind::NotFound {
                    debug!("Could not remove {}: {}", self.path.display(), e);
                }
            }
        }
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, key: &str, blob: &str) -> Result<(), StoreError> {
        let target = self.path_for(key);
        let temp = PendingTemp::new(self.temp_path_for(&target));

        let mut file = fs::File::create(&temp.path).await?;
        file.write_all(blob.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp.path, &target).await?;
        temp.persisted();

        debug!("Wrote {} ({} bytes)", target.display(), blob.len());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::ConversationStore;
    use crate::models::chat::ChatMessage;
    use std::sync::Arc;

    #[tokio::test]
    async fn missing_key_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobStore::new(dir.path().to_path_buf()).unwrap();
        assert!(store.load("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn store_replaces_previous_blob_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobStore::new(dir.path().to_path_buf()).unwrap();

        store.store("k", "[1]").await.unwrap();
        store.store("k", "[1,2]").await.unwrap();

        assert_eq!(store.load("k").await.unwrap().as_deref(), Some("[1,2]"));
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn odd_keys_map_to_distinct_safe_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobStore::new(dir.path().to_path_buf()).unwrap();

        store.store("../../etc/passwd", "a").await.unwrap();
        store.store("user/with/slashes", "b").await.unwrap();

        assert_eq!(store.load("../../etc/passwd").await.unwrap().as_deref(), Some("a"));
        assert_eq!(store.load("user/with/slashes").await.unwrap().as_deref(), Some("b"));
        for entry in std::fs::read_dir(dir.path()).unwrap() {
            let name = entry.unwrap().file_name().into_string().unwrap();
            assert_eq!(name.len(), 64 + ".json".len());
        }
    }

    #[tokio::test]
    async fn conversations_survive_reopening_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        {
            let backend = FileBlobStore::new(dir.path().to_path_buf()).unwrap();
            let store = ConversationStore::new(Arc::new(backend));
            store.append("alice", ChatMessage::user("remember me")).await.unwrap();
            store.append("alice", ChatMessage::assistant("noted")).await.unwrap();
        }

        let backend = FileBlobStore::new(dir.path().to_path_buf()).unwrap();
        let store = ConversationStore::new(Arc::new(backend));
        assert_eq!(store.read("alice").await.unwrap(), vec![
            ChatMessage::user("remember me"),
            ChatMessage::assistant("noted"),
        ]);
    }

    #[tokio::test]
    async fn failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobStore::new(dir.path().to_path_buf()).unwrap();
        std::fs::create_dir(store.path_for("k")).unwrap();

        assert!(store.store("k", "[]").await.is_err());
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".json"));
    }

    #[test]
    fn abandoned_temp_file_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.json.1.0.tmp");
        std::fs::write(&path, "partial").unwrap();

        drop(PendingTemp::new(path.clone()));
        assert!(!path.exists());

        std::fs::write(&path, "done").unwrap();
        PendingTemp::new(path.clone()).persisted();
        assert!(path.exists());
    }

    #[test]
    fn creates_missing_root_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("conversations");
        FileBlobStore::new(root.clone()).unwrap();
        assert!(root.is_dir());
    }
}
