mod file;
mod memory;
mod redis;

pub use self::file::FileBlobStore;
pub use self::memory::MemoryBlobStore;
pub use self::redis::RedisBlobStore;

use async_trait::async_trait;
use log::{ debug, error, info };
use std::collections::HashMap;
use std::error::Error;
use std::path::PathBuf;
use std::sync::{ Arc, Mutex };
use thiserror::Error as ThisError;
use crate::cli::Args;
use crate::models::chat::ChatMessage;

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("corrupt conversation blob: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Key/blob persistence underneath the conversation store.
///
/// `store` must replace the previous blob atomically: a concurrent or later
/// `load` sees either the old blob or the new one, never a mix.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn store(&self, key: &str, blob: &str) -> Result<(), StoreError>;

    fn name(&self) -> &'static str;
}

type Partition = Arc<tokio::sync::Mutex<()>>;

/// Per-key ordered message logs, persisted as one JSON list per key.
///
/// Every operation on a key runs while holding that key's partition cell,
/// so read-modify-write appends on the same key never lose messages.
/// Operations on different keys do not contend.
pub struct ConversationStore {
    backend: Arc<dyn BlobStore>,
    partitions: Mutex<HashMap<String, Partition>>,
}

/// A caller's hold on a key's partition cell. Dropping it, including when the
/// owning future is cancelled, removes the cell from the map once idle.
struct PartitionLease<'a> {
    partitions: &'a Mutex<HashMap<String, Partition>>,
    key: &'a str,
    cell: Partition,
}

impl Drop for PartitionLease<'_> {
    // Clones only happen under the map lock, so a count of two (map + lease)
    // means nobody else is waiting on this cell.
    fn drop(&mut self) {
        let mut partitions = self.partitions.lock().unwrap_or_else(|e| e.into_inner());
        let idle = Arc::strong_count(&self.cell) == 2 &&
            partitions.get(self.key).is_some_and(|held| Arc::ptr_eq(held, &self.cell));
        if idle {
            partitions.remove(self.key);
        }
    }
}

impl ConversationStore {
    pub fn new(backend: Arc<dyn BlobStore>) -> Self {
        Self {
            backend,
            partitions: Mutex::new(HashMap::new()),
        }
    }

    pub async fn append(&self, key: &str, message: ChatMessage) -> Result<(), StoreError> {
        let lease = self.acquire(key);
        let _guard = lease.cell.lock().await;
        self.append_locked(key, message).await
    }

    pub async fn read(&self, key: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let lease = self.acquire(key);
        let _guard = lease.cell.lock().await;
        self.load_messages(key).await
    }

    pub async fn clear(&self, key: &str) -> Result<(), StoreError> {
        let lease = self.acquire(key);
        let _guard = lease.cell.lock().await;
        self.save_messages(key, &[]).await
    }

    async fn append_locked(&self, key: &str, message: ChatMessage) -> Result<(), StoreError> {
        let mut messages = self.load_messages(key).await?;
        messages.push(message);
        self.save_messages(key, &messages).await
    }

    async fn load_messages(&self, key: &str) -> Result<Vec<ChatMessage>, StoreError> {
        match self.backend.load(key).await? {
            Some(blob) => Ok(serde_json::from_str(&blob)?),
            None => Ok(Vec::new()),
        }
    }

    async fn save_messages(&self, key: &str, messages: &[ChatMessage]) -> Result<(), StoreError> {
        let blob = serde_json::to_string(messages)?;
        self.backend.store(key, &blob).await?;
        debug!("Persisted {} message(s) for '{}' via {}", messages.len(), key, self.backend.name());
        Ok(())
    }

    fn acquire<'a>(&'a self, key: &'a str) -> PartitionLease<'a> {
        let mut partitions = self.partitions.lock().unwrap_or_else(|e| e.into_inner());
        let cell = partitions.entry(key.to_string()).or_default().clone();
        PartitionLease { partitions: &self.partitions, key, cell }
    }

    #[cfg(test)]
    fn partition_count(&self) -> usize {
        self.partitions.lock().unwrap().len()
    }
}

pub fn create_blob_store(
    args: &Args
) -> Result<Option<Arc<dyn BlobStore>>, Box<dyn Error + Send + Sync>> {
    let kind = args.history_type.trim().to_lowercase();
    let location = args.history_host.trim();

    match kind.as_str() {
        "none" | "" => Ok(None),
        "memory" => Ok(Some(Arc::new(MemoryBlobStore::new()))),
        "file" | "redis" if location.is_empty() => {
            error!("HISTORY_HOST is empty; the '{}' history store cannot be created", kind);
            Ok(None)
        }
        "file" => {
            let store = FileBlobStore::new(PathBuf::from(location))?;
            Ok(Some(Arc::new(store)))
        }
        "redis" => {
            let store = RedisBlobStore::new(location, &args.history_redis_prefix)?;
            Ok(Some(Arc::new(store)))
        }
        _ =>
            Err(
                Box::new(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("Unsupported history store type: {}", args.history_type)
                    )
                )
            ),
    }
}

pub fn initialize_history_store(
    args: &Args
) -> Result<Option<Arc<ConversationStore>>, Box<dyn Error + Send + Sync>> {
    match create_blob_store(args)? {
        Some(backend) => {
            info!("Chat history will be stored in: {} at {}", backend.name(), args.history_host);
            Ok(Some(Arc::new(ConversationStore::new(backend))))
        }
        None => {
            error!(
                "No conversation store configured (HISTORY_TYPE={}). Every request will be answered with 503.",
                args.history_type
            );
            Ok(None)
        }
    }
}
