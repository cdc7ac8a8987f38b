use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::models::ScopeKey;

/// Grouped statistics settings.
///
/// The cache lifetime is given in parts that are summed, so
/// `cache_minutes = 5` and `cache_seconds = 300` mean the same thing.
/// A total of zero stores entries without expiry. The total may not exceed
/// [`StatisticsConfig::MAX_CACHE_TTL`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatisticsConfig {
    #[serde(default)]
    pub cache_hours: u64,

    #[serde(default = "default_cache_minutes")]
    pub cache_minutes: u64,

    #[serde(default)]
    pub cache_seconds: u64,

    /// NGO used when the request carries no caller identity.
    #[serde(default = "default_ngo_id")]
    pub default_ngo_id: i32,

    /// Organizer flag used when the request carries no caller identity.
    #[serde(default)]
    pub default_organizer: bool,

    /// Let one of several concurrent misses on the same key compute while
    /// the others wait for its result. Off by default: concurrent misses each
    /// query the database and the last write wins.
    #[serde(default)]
    pub deduplicate_concurrent_misses: bool,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            cache_hours: 0,
            cache_minutes: default_cache_minutes(),
            cache_seconds: 0,
            default_ngo_id: default_ngo_id(),
            default_organizer: false,
            deduplicate_concurrent_misses: false,
        }
    }
}

impl StatisticsConfig {
    /// Longest accepted cache lifetime: one year.
    pub const MAX_CACHE_TTL: Duration = Duration::from_secs(365 * 24 * 3600);

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(
            self.cache_hours
                .saturating_mul(3600)
                .saturating_add(self.cache_minutes.saturating_mul(60))
                .saturating_add(self.cache_seconds),
        )
    }

    fn checked_cache_ttl(&self) -> Option<Duration> {
        let secs = self
            .cache_hours
            .checked_mul(3600)?
            .checked_add(self.cache_minutes.checked_mul(60)?)?
            .checked_add(self.cache_seconds)?;
        Some(Duration::from_secs(secs))
    }

    pub fn default_scope(&self) -> ScopeKey {
        ScopeKey {
            is_organizer: self.default_organizer,
            ngo_id: self.default_ngo_id,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.checked_cache_ttl() {
            Some(ttl) if ttl <= Self::MAX_CACHE_TTL => {}
            _ => {
                return Err(ConfigError::Validation(format!(
                    "statistics cache lifetime cannot exceed {} seconds",
                    Self::MAX_CACHE_TTL.as_secs()
                )));
            }
        }
        if self.default_ngo_id < 0 {
            return Err(ConfigError::Validation(
                "statistics.default_ngo_id cannot be negative".into(),
            ));
        }
        Ok(())
    }

    /// Settings that are valid but probably not what was meant.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.cache_ttl().is_zero() {
            warnings.push(
                "statistics cache lifetime is zero: cached aggregates will never expire".into(),
            );
        }
        warnings
    }
}

fn default_cache_minutes() -> u64 {
    5
}

fn default_ngo_id() -> i32 {
    1
}
