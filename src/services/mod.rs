mod counters;
mod statistics;

use std::sync::Arc;

pub use counters::CounterService;
pub use statistics::{StatisticsError, StatisticsService};

use crate::{
    cache::{Cache, CacheAsideLoader, CacheStore},
    config::StatisticsConfig,
    db::StatisticsRepo,
};

/// Metric label for statistics cache operations.
const STATISTICS_CACHE_TYPE: &str = "statistics";

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub statistics: StatisticsService,
    pub counters: CounterService,
}

impl Services {
    pub fn new(
        repo: Arc<dyn StatisticsRepo>,
        cache: Option<Arc<dyn Cache>>,
        config: &StatisticsConfig,
    ) -> Self {
        let loader = CacheAsideLoader::new(
            cache.map(|cache| CacheStore::new(cache, STATISTICS_CACHE_TYPE)),
        )
        .with_single_flight(config.deduplicate_concurrent_misses);

        if !loader.is_cached() {
            tracing::info!("No cache configured, statistics are computed on every request");
        }

        Self {
            statistics: StatisticsService::new(repo.clone(), loader, config.cache_ttl()),
            counters: CounterService::new(repo),
        }
    }
}
