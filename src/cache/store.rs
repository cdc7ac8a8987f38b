use std::{sync::Arc, time::Duration};

use serde::{Serialize, de::DeserializeOwned};

use super::{
    error::{CacheError, CacheResult},
    traits::Cache,
};
use crate::observability::metrics;

/// Outcome of a typed cache read.
#[derive(Debug)]
pub enum CacheLookup<T> {
    Hit(T),
    Miss,
    /// The backend failed or the stored payload could not be decoded.
    Unavailable(CacheError),
}

impl<T> CacheLookup<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }

    /// Collapse to hit-or-miss, treating an unavailable cache as a miss.
    pub fn into_option(self) -> Option<T> {
        match self {
            CacheLookup::Hit(value) => Some(value),
            CacheLookup::Miss | CacheLookup::Unavailable(_) => None,
        }
    }
}

/// JSON-typed view over a [`Cache`] backend that never fails outward.
///
/// `cache_type` labels logs and metrics so several stores can share one
/// backend.
#[derive(Clone)]
pub struct CacheStore {
    cache: Arc<dyn Cache>,
    cache_type: &'static str,
}

impl CacheStore {
    pub fn new(cache: Arc<dyn Cache>, cache_type: &'static str) -> Self {
        Self { cache, cache_type }
    }

    pub fn backend_name(&self) -> &'static str {
        self.cache.backend_name()
    }

    pub async fn lookup<T: DeserializeOwned>(&self, key: &str) -> CacheLookup<T> {
        let bytes = match self.cache.get_bytes(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                metrics::record_cache_operation(self.cache_type, "get", "miss");
                return CacheLookup::Miss;
            }
            Err(e) => {
                metrics::record_cache_operation(self.cache_type, "get", "error");
                return CacheLookup::Unavailable(e);
            }
        };

        match decode(&bytes) {
            Ok(value) => {
                metrics::record_cache_operation(self.cache_type, "get", "hit");
                CacheLookup::Hit(value)
            }
            Err(e) => {
                metrics::record_cache_operation(self.cache_type, "get", "error");
                CacheLookup::Unavailable(e)
            }
        }
    }

    /// Best-effort write. Returns whether the value was stored.
    pub async fn store<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                metrics::record_cache_operation(self.cache_type, "set", "error");
                tracing::warn!(
                    cache_key = %key,
                    error = %e,
                    "Failed to serialize value for cache"
                );
                return false;
            }
        };

        match self.cache.set_bytes(key, &bytes, ttl).await {
            Ok(()) => {
                metrics::record_cache_operation(self.cache_type, "set", "success");
                tracing::debug!(
                    cache_key = %key,
                    ttl_secs = ttl.as_secs(),
                    size_bytes = bytes.len(),
                    "Stored value in cache"
                );
                true
            }
            Err(e) => {
                metrics::record_cache_operation(self.cache_type, "set", "error");
                tracing::warn!(
                    cache_key = %key,
                    backend = self.cache.backend_name(),
                    error = %e,
                    "Failed to write to cache"
                );
                false
            }
        }
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> CacheResult<T> {
    serde_json::from_slice(bytes).map_err(|e| CacheError::Deserialization(e.to_string()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;

    use super::*;

    /// A backend whose every operation fails.
    pub struct FailingCache;

    #[async_trait]
    impl Cache for FailingCache {
        async fn get_bytes(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
            Err(CacheError::Internal("backend down".into()))
        }

        async fn set_bytes(&self, _key: &str, _value: &[u8], _ttl: Duration) -> CacheResult<()> {
            Err(CacheError::Internal("backend down".into()))
        }

        fn backend_name(&self) -> &'static str {
            "failing"
        }
    }
}
