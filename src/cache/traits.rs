use std::time::Duration;

use async_trait::async_trait;

use super::error::CacheResult;

/// Byte-level key/value store with per-entry expiry.
///
/// A zero `ttl` stores the entry without expiration.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get raw bytes from cache
    async fn get_bytes(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Set raw bytes in cache with TTL
    async fn set_bytes(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()>;

    /// Backend name used in logs and metric labels.
    fn backend_name(&self) -> &'static str;
}
