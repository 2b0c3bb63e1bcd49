use async_trait::async_trait;
use crate::history::{ BlobStore, StoreError };
use log::debug;
use redis::{ Client, AsyncCommands };

pub struct RedisBlobStore {
    client: Client,
    key_prefix: String,
}

impl RedisBlobStore {
    pub fn new(url: &str, key_prefix: &str) -> Result<Self, StoreError> {
        Ok(Self {
            client: Client::open(url)?,
            key_prefix: key_prefix.to_string(),
        })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }

    fn key_for(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl BlobStore for RedisBlobStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.get_connection().await?;
        let blob: Option<String> = conn.get(self.key_for(key)).await?;
        Ok(blob)
    }

    async fn store(&self, key: &str, blob: &str) -> Result<(), StoreError> {
        let mut conn = self.get_connection().await?;
        let redis_key = self.key_for(key);
        let _: () = conn.set(&redis_key, blob).await?;
        debug!("SET {} ({} bytes)", redis_key, blob.len());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
