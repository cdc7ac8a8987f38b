use std::time::Duration;

use async_trait::async_trait;
use redis::{FromRedisValue, aio::MultiplexedConnection};

use super::{
    error::{CacheError, CacheResult},
    traits::Cache,
};
use crate::config::RedisCacheConfig;

/// Redis-backed cache shared between all nodes.
///
/// Connections are opened per operation. Both the connect and the command
/// are bounded by timeouts, so a Redis outage or a stalled server degrades
/// reads to misses instead of stalling requests.
pub struct RedisCache {
    client: redis::Client,
    key_prefix: String,
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl RedisCache {
    pub fn from_config(config: &RedisCacheConfig) -> CacheResult<Self> {
        let client = redis::Client::open(config.url.as_str())?;

        Ok(Self {
            client,
            key_prefix: config.key_prefix.clone(),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            command_timeout: Duration::from_secs(config.command_timeout_secs),
        })
    }

    fn prefixed_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    async fn get_connection(&self) -> CacheResult<MultiplexedConnection> {
        let conn = tokio::time::timeout(
            self.connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| CacheError::Timeout(self.connect_timeout.as_secs()))??;
        Ok(conn)
    }

    /// Connect and run `cmd`, each step under its own timeout.
    async fn query<T: FromRedisValue>(&self, cmd: &redis::Cmd) -> CacheResult<T> {
        let mut conn = self.get_connection().await?;

        let value = tokio::time::timeout(self.command_timeout, cmd.query_async(&mut conn))
            .await
            .map_err(|_| CacheError::Timeout(self.command_timeout.as_secs()))??;
        Ok(value)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_bytes(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(self.prefixed_key(key));

        self.query(&cmd).await
    }

    async fn set_bytes(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        // Redis expiry has second granularity; round sub-second TTLs up.
        let mut cmd = redis::cmd("SET");
        cmd.arg(self.prefixed_key(key)).arg(value);
        if !ttl.is_zero() {
            let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
            cmd.arg("EX").arg(secs);
        }

        self.query::<()>(&cmd).await
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
