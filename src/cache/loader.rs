use std::{future::Future, sync::Arc, time::Duration};

use dashmap::DashMap;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;

use super::store::{CacheLookup, CacheStore};

/// Get-or-compute over a [`CacheStore`].
///
/// Without a store every call computes. Concurrent misses on the same key
/// each compute and each write, last write wins, unless the in-flight guard
/// is enabled with [`CacheAsideLoader::with_single_flight`].
#[derive(Clone, Default)]
pub struct CacheAsideLoader {
    store: Option<CacheStore>,
    in_flight: Option<Arc<DashMap<String, Arc<Mutex<()>>>>>,
}

impl CacheAsideLoader {
    pub fn new(store: Option<CacheStore>) -> Self {
        Self {
            store,
            in_flight: None,
        }
    }

    /// Serialize concurrent misses on one key within this process.
    ///
    /// The first caller computes and stores; the rest wait and then read the
    /// stored value. Other processes sharing the backend are not coordinated.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.in_flight = enabled.then(|| Arc::new(DashMap::new()));
        self
    }

    pub fn is_cached(&self) -> bool {
        self.store.is_some()
    }

    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(store) = &self.store else {
            return compute().await;
        };

        if let Some(value) = read(store, key).await {
            return Ok(value);
        }

        let Some(in_flight) = &self.in_flight else {
            return compute_and_store(store, key, ttl, compute).await;
        };

        let lock = in_flight.entry(key.to_string()).or_default().clone();
        let result = {
            let _guard = lock.lock().await;
            // Another caller may have filled the entry while we waited.
            match read(store, key).await {
                Some(value) => Ok(value),
                None => compute_and_store(store, key, ttl, compute).await,
            }
        };
        drop(lock);
        in_flight.remove_if(key, |_, l| Arc::strong_count(l) == 1);

        result
    }
}

async fn read<T: DeserializeOwned>(store: &CacheStore, key: &str) -> Option<T> {
    match store.lookup(key).await {
        CacheLookup::Hit(value) => {
            tracing::debug!(cache_key = %key, "Cache hit");
            Some(value)
        }
        CacheLookup::Miss => {
            tracing::debug!(cache_key = %key, "Cache miss");
            None
        }
        CacheLookup::Unavailable(e) => {
            tracing::warn!(
                cache_key = %key,
                backend = store.backend_name(),
                error = %e,
                "Cache lookup failed, treating as miss"
            );
            None
        }
    }
}

async fn compute_and_store<T, E, F, Fut>(
    store: &CacheStore,
    key: &str,
    ttl: Duration,
    compute: F,
) -> Result<T, E>
where
    T: Serialize + Send + Sync,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let value = compute().await?;
    store.store(key, &value, ttl).await;
    Ok(value)
}
