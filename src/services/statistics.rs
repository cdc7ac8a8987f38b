use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{
    cache::{CacheAsideLoader, CacheKeys},
    db::{DbError, StatisticsRepo},
    models::{AggregateRow, GroupingMode, PageRequest, PagedResult, ScopeKey},
    observability::metrics,
};

#[derive(Debug, Error)]
pub enum StatisticsError {
    #[error(transparent)]
    Database(#[from] DbError),

    #[error("Statistics request was cancelled")]
    Cancelled,
}

/// Scope-aware grouped statistics, cached per (mode, scope) and paginated
/// per request.
#[derive(Clone)]
pub struct StatisticsService {
    repo: Arc<dyn StatisticsRepo>,
    loader: CacheAsideLoader,
    ttl: Duration,
}

impl StatisticsService {
    pub fn new(repo: Arc<dyn StatisticsRepo>, loader: CacheAsideLoader, ttl: Duration) -> Self {
        Self { repo, loader, ttl }
    }

    /// Return one page of the grouped aggregate for `mode` as seen by `scope`.
    ///
    /// The full ordered set is read from the cache or computed and cached,
    /// then sliced. A data-source failure or cancellation caches nothing.
    pub async fn get_grouped_statistics(
        &self,
        mode: GroupingMode,
        scope: ScopeKey,
        page: PageRequest,
        cancel: &CancellationToken,
    ) -> Result<PagedResult<AggregateRow>, StatisticsError> {
        let key = CacheKeys::statistics(mode, scope);
        let started = Instant::now();

        let result = self
            .loader
            .get_or_compute(&key, self.ttl, || async {
                tokio::select! {
                    _ = cancel.cancelled() => Err(StatisticsError::Cancelled),
                    rows = self.repo.run_aggregate_query(mode, scope) => {
                        rows.map_err(StatisticsError::from)
                    }
                }
            })
            .await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(StatisticsError::Cancelled) => "cancelled",
            Err(StatisticsError::Database(_)) => "error",
        };
        metrics::record_statistics_query(mode.as_str(), outcome, started.elapsed().as_secs_f64());

        let rows: Vec<AggregateRow> = result?;
        tracing::debug!(
            mode = %mode,
            is_organizer = scope.is_organizer,
            ngo_id = scope.ngo_id,
            total_items = rows.len(),
            page = page.page,
            page_size = page.page_size,
            "Grouped statistics resolved"
        );

        Ok(PagedResult::from_full_set(&rows, page))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        cache::{CacheStore, MemoryCache, test_support::FailingCache},
        config::MemoryCacheConfig,
        db::DbResult,
        models::LiveCounter,
    };

    const TTL: Duration = Duration::from_secs(300);

    /// Organizers see `[CJ:50, BV:30, IS:10]`; an NGO sees one row named after it.
    #[derive(Default)]
    struct FakeRepo {
        calls: AtomicUsize,
        fail: AtomicBool,
        hang: AtomicBool,
        seen: Mutex<Vec<(GroupingMode, ScopeKey)>>,
    }

    impl FakeRepo {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatisticsRepo for FakeRepo {
        async fn run_aggregate_query(
            &self,
            mode: GroupingMode,
            scope: ScopeKey,
        ) -> DbResult<Vec<AggregateRow>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push((mode, scope));

            if self.hang.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(DbError::Internal("connection reset".into()));
            }

            let rows = match (mode, scope.is_organizer) {
                (GroupingMode::County, true) => vec![
                    AggregateRow::new("CJ", Some("CJ".into()), 50),
                    AggregateRow::new("BV", Some("BV".into()), 30),
                    AggregateRow::new("IS", Some("IS".into()), 10),
                ],
                (GroupingMode::County, false) => {
                    vec![AggregateRow::new(format!("NGO{}", scope.ngo_id), None, 1)]
                }
                (GroupingMode::PollingStation, _) => {
                    vec![AggregateRow::new("12", Some("CJ".into()), 7)]
                }
            };
            Ok(rows)
        }

        async fn count(&self, _counter: LiveCounter) -> DbResult<i64> {
            Ok(0)
        }
    }

    fn service_with(repo: Arc<FakeRepo>, loader: CacheAsideLoader) -> StatisticsService {
        StatisticsService::new(repo, loader, TTL)
    }

    fn memory_service(repo: Arc<FakeRepo>) -> StatisticsService {
        let cache = Arc::new(MemoryCache::new(&MemoryCacheConfig::default()));
        service_with(
            repo,
            CacheAsideLoader::new(Some(CacheStore::new(cache, "statistics"))),
        )
    }

    fn labels(page: &PagedResult<AggregateRow>) -> Vec<&str> {
        page.data.iter().map(|r| r.label.as_str()).collect()
    }

    #[tokio::test]
    async fn test_pages_over_cached_full_set() {
        let repo = Arc::new(FakeRepo::default());
        let service = memory_service(repo.clone());
        let cancel = CancellationToken::new();
        let scope = ScopeKey::organizer(1);

        let first = service
            .get_grouped_statistics(GroupingMode::County, scope, PageRequest::new(1, 2), &cancel)
            .await
            .unwrap();
        assert_eq!(labels(&first), ["CJ", "BV"]);
        assert_eq!(first.total_items, 3);

        let second = service
            .get_grouped_statistics(GroupingMode::County, scope, PageRequest::new(2, 2), &cancel)
            .await
            .unwrap();
        assert_eq!(labels(&second), ["IS"]);
        assert_eq!(second.total_items, 3);

        assert_eq!(repo.calls(), 1, "second page must come from the cache");
    }

    #[tokio::test]
    async fn test_repeated_calls_are_identical() {
        let repo = Arc::new(FakeRepo::default());
        let service = memory_service(repo.clone());
        let cancel = CancellationToken::new();

        let a = service
            .get_grouped_statistics(
                GroupingMode::County,
                ScopeKey::organizer(1),
                PageRequest::default(),
                &cancel,
            )
            .await
            .unwrap();
        let b = service
            .get_grouped_statistics(
                GroupingMode::County,
                ScopeKey::organizer(1),
                PageRequest::default(),
                &cancel,
            )
            .await
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(repo.calls(), 1);
    }

    #[tokio::test]
    async fn test_out_of_range_page_is_empty_with_total() {
        let repo = Arc::new(FakeRepo::default());
        let service = memory_service(repo);

        let page = service
            .get_grouped_statistics(
                GroupingMode::County,
                ScopeKey::organizer(1),
                PageRequest::new(1000, 10),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(page.data.is_empty());
        assert_eq!(page.total_items, 3);
    }

    #[tokio::test]
    async fn test_scopes_and_modes_do_not_share_entries() {
        let repo = Arc::new(FakeRepo::default());
        let service = memory_service(repo.clone());
        let cancel = CancellationToken::new();

        let requests = [
            (GroupingMode::County, ScopeKey::organizer(1)),
            (GroupingMode::County, ScopeKey::ngo(1)),
            (GroupingMode::County, ScopeKey::ngo(2)),
            (GroupingMode::PollingStation, ScopeKey::ngo(1)),
        ];
        let mut results = Vec::new();
        for (mode, scope) in requests {
            results.push(
                service
                    .get_grouped_statistics(mode, scope, PageRequest::default(), &cancel)
                    .await
                    .unwrap(),
            );
        }

        assert_eq!(repo.calls(), requests.len());
        assert_eq!(labels(&results[1]), ["NGO1"]);
        assert_eq!(labels(&results[2]), ["NGO2"]);
        assert_eq!(*repo.seen.lock().unwrap(), requests);
    }

    #[tokio::test]
    async fn test_failing_cache_still_serves_data() {
        let repo = Arc::new(FakeRepo::default());
        let service = service_with(
            repo.clone(),
            CacheAsideLoader::new(Some(CacheStore::new(Arc::new(FailingCache), "statistics"))),
        );
        let cancel = CancellationToken::new();

        for _ in 0..2 {
            let page = service
                .get_grouped_statistics(
                    GroupingMode::County,
                    ScopeKey::organizer(1),
                    PageRequest::new(1, 2),
                    &cancel,
                )
                .await
                .unwrap();
            assert_eq!(labels(&page), ["CJ", "BV"]);
            assert_eq!(page.total_items, 3);
        }
        assert_eq!(repo.calls(), 2);
    }

    #[tokio::test]
    async fn test_without_cache_always_queries() {
        let repo = Arc::new(FakeRepo::default());
        let service = service_with(repo.clone(), CacheAsideLoader::default());
        let cancel = CancellationToken::new();

        for _ in 0..3 {
            service
                .get_grouped_statistics(
                    GroupingMode::PollingStation,
                    ScopeKey::ngo(3),
                    PageRequest::default(),
                    &cancel,
                )
                .await
                .unwrap();
        }
        assert_eq!(repo.calls(), 3);
    }

    #[tokio::test]
    async fn test_database_error_is_not_cached() {
        let repo = Arc::new(FakeRepo::default());
        let service = memory_service(repo.clone());
        let cancel = CancellationToken::new();

        repo.fail.store(true, Ordering::SeqCst);
        let err = service
            .get_grouped_statistics(
                GroupingMode::County,
                ScopeKey::organizer(1),
                PageRequest::default(),
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StatisticsError::Database(_)));

        repo.fail.store(false, Ordering::SeqCst);
        let page = service
            .get_grouped_statistics(
                GroupingMode::County,
                ScopeKey::organizer(1),
                PageRequest::default(),
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(page.total_items, 3);
        assert_eq!(repo.calls(), 2);
    }

    #[tokio::test]
    async fn test_cancellation_aborts_query_and_caches_nothing() {
        let repo = Arc::new(FakeRepo::default());
        let service = memory_service(repo.clone());

        repo.hang.store(true, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        let task = {
            let service = service.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                service
                    .get_grouped_statistics(
                        GroupingMode::County,
                        ScopeKey::organizer(1),
                        PageRequest::default(),
                        &cancel,
                    )
                    .await
            })
        };

        while repo.calls() == 0 {
            tokio::task::yield_now().await;
        }
        cancel.cancel();
        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, StatisticsError::Cancelled));

        repo.hang.store(false, Ordering::SeqCst);
        let page = service
            .get_grouped_statistics(
                GroupingMode::County,
                ScopeKey::organizer(1),
                PageRequest::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(page.total_items, 3);
        assert_eq!(repo.calls(), 2);
    }

    #[tokio::test]
    async fn test_huge_ttl_caches_without_expiry() {
        let repo = Arc::new(FakeRepo::default());
        let cache = Arc::new(MemoryCache::new(&MemoryCacheConfig::default()));
        let service = StatisticsService::new(
            repo.clone(),
            CacheAsideLoader::new(Some(CacheStore::new(cache, "statistics"))),
            Duration::from_secs(u64::MAX / 3600 * 3600),
        );
        let cancel = CancellationToken::new();

        for _ in 0..2 {
            let page = service
                .get_grouped_statistics(
                    GroupingMode::County,
                    ScopeKey::organizer(1),
                    PageRequest::default(),
                    &cancel,
                )
                .await
                .unwrap();
            assert_eq!(page.total_items, 3);
        }
        assert_eq!(repo.calls(), 1);
    }

    #[tokio::test]
    async fn test_cached_hit_ignores_cancelled_token() {
        let repo = Arc::new(FakeRepo::default());
        let service = memory_service(repo.clone());

        service
            .get_grouped_statistics(
                GroupingMode::County,
                ScopeKey::organizer(1),
                PageRequest::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let page = service
            .get_grouped_statistics(
                GroupingMode::County,
                ScopeKey::organizer(1),
                PageRequest::default(),
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(page.total_items, 3);
        assert_eq!(repo.calls(), 1);
    }
}
