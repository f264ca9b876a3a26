use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, RedisError, RedisResult, aio::MultiplexedConnection};
use thiserror::Error;
use tracing::warn;

use super::{ArticleCache, CacheBackend, CacheConfig};

const SOURCE: &str = "taccuino::cache::redis";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] RedisError),
    #[error("timed out after {0:?} connecting to redis")]
    Timeout(Duration),
}

/// Article cache stored in a single Redis hash, one field per filename.
#[derive(Clone)]
pub struct RedisCache {
    connection: MultiplexedConnection,
    hash_key: String,
}

impl RedisCache {
    /// Open a multiplexed connection and confirm the server answers `PING`.
    pub async fn connect(config: &CacheConfig) -> Result<Self, CacheError> {
        let client = Client::open(config.redis_url.as_str())?;

        let handshake = async {
            let mut connection = client.get_multiplexed_async_connection().await?;
            let _: String = redis::cmd("PING").query_async(&mut connection).await?;
            Ok::<_, RedisError>(connection)
        };

        let connection = tokio::time::timeout(config.connect_timeout, handshake)
            .await
            .map_err(|_| CacheError::Timeout(config.connect_timeout))??;

        Ok(Self {
            connection,
            hash_key: config.hash_key.clone(),
        })
    }
}

#[async_trait]
impl ArticleCache for RedisCache {
    async fn get(&self, filename: &str) -> Option<String> {
        let mut connection = self.connection.clone();
        let result: RedisResult<Option<String>> = connection.hget(&self.hash_key, filename).await;
        match result {
            Ok(body) => body,
            Err(err) => {
                warn!(target = SOURCE, op = "hget", filename, error = %err, "Cache read failed; treating as miss");
                None
            }
        }
    }

    async fn set(&self, filename: &str, body: &str) {
        let mut connection = self.connection.clone();
        let result: RedisResult<()> = connection.hset(&self.hash_key, filename, body).await;
        if let Err(err) = result {
            warn!(target = SOURCE, op = "hset", filename, error = %err, "Cache write failed");
        }
    }

    async fn clear_all(&self) {
        let mut connection = self.connection.clone();
        let result: RedisResult<()> = connection.del(&self.hash_key).await;
        if let Err(err) = result {
            warn!(target = SOURCE, op = "del", hash_key = %self.hash_key, error = %err, "Cache clear failed");
        }
    }

    fn backend(&self) -> CacheBackend {
        CacheBackend::Redis
    }
}
