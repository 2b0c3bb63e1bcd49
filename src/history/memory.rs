use async_trait::async_trait;
use crate::history::{ BlobStore, StoreError };
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local backend. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.blobs.read().await.get(key).cloned())
    }

    async fn store(&self, key: &str, blob: &str) -> Result<(), StoreError> {
        self.blobs.write().await.insert(key.to_string(), blob.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
