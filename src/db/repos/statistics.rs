use async_trait::async_trait;

use crate::{
    db::error::DbResult,
    models::{AggregateRow, GroupingMode, LiveCounter, ScopeKey},
};

/// Read-only queries over the observation log.
#[async_trait]
pub trait StatisticsRepo: Send + Sync {
    /// Run the grouped query for `mode`, restricted to what `scope` may see.
    ///
    /// Rows are ordered by value descending, then by the grouping columns.
    async fn run_aggregate_query(
        &self,
        mode: GroupingMode,
        scope: ScopeKey,
    ) -> DbResult<Vec<AggregateRow>>;

    /// Count one live metric over the whole log. Not scope-filtered.
    async fn count(&self, counter: LiveCounter) -> DbResult<i64>;
}
