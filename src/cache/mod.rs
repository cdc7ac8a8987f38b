mod error;
mod keys;
mod loader;
mod memory;
#[cfg(feature = "redis")]
mod redis;
mod store;
mod traits;

use std::sync::Arc;

pub use error::{CacheError, CacheResult};
pub use keys::CacheKeys;
pub use loader::CacheAsideLoader;
pub use memory::MemoryCache;
#[cfg(feature = "redis")]
pub use redis::RedisCache;
#[cfg(test)]
pub(crate) use store::test_support;
pub use store::{CacheLookup, CacheStore};
pub use traits::Cache;

use crate::config::CacheConfig;

/// Build the configured cache backend, or `None` when caching is disabled.
pub fn from_config(config: &CacheConfig) -> CacheResult<Option<Arc<dyn Cache>>> {
    match config {
        CacheConfig::None => Ok(None),
        CacheConfig::Memory(c) => {
            tracing::info!(max_entries = c.max_entries, "Using in-memory cache");
            Ok(Some(Arc::new(MemoryCache::new(c))))
        }
        #[cfg(feature = "redis")]
        CacheConfig::Redis(c) => {
            tracing::info!(key_prefix = %c.key_prefix, "Using Redis cache");
            Ok(Some(Arc::new(RedisCache::from_config(c)?)))
        }
        #[cfg(not(feature = "redis"))]
        CacheConfig::Redis(_) => Err(CacheError::Internal(
            "Redis cache requires the 'redis' feature".into(),
        )),
    }
}
