use std::sync::Arc;

use crate::{
    db::{DbResult, StatisticsRepo},
    models::{LabeledCounter, LiveCounter},
};

/// Dashboard counters. Always live: no caching, pagination or scope filter.
#[derive(Clone)]
pub struct CounterService {
    repo: Arc<dyn StatisticsRepo>,
}

impl CounterService {
    pub fn new(repo: Arc<dyn StatisticsRepo>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, counter: LiveCounter) -> DbResult<LabeledCounter> {
        let value = self.repo.count(counter).await?;
        Ok(LabeledCounter {
            label: counter.label().to_string(),
            value: value.to_string(),
        })
    }

    /// All six counters in [`LiveCounter::ALL`] order. Fails on the first
    /// counter that fails.
    pub async fn all(&self) -> DbResult<Vec<LabeledCounter>> {
        let mut counters = Vec::with_capacity(LiveCounter::ALL.len());
        for counter in LiveCounter::ALL {
            counters.push(self.get(counter).await?);
        }
        Ok(counters)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::{
        db::DbError,
        models::{AggregateRow, GroupingMode, ScopeKey},
    };

    /// Counts are the counter's position in `LiveCounter::ALL`, times ten.
    struct PositionRepo {
        fail_on: Option<LiveCounter>,
    }

    #[async_trait]
    impl StatisticsRepo for PositionRepo {
        async fn run_aggregate_query(
            &self,
            _mode: GroupingMode,
            _scope: ScopeKey,
        ) -> DbResult<Vec<AggregateRow>> {
            Ok(vec![])
        }

        async fn count(&self, counter: LiveCounter) -> DbResult<i64> {
            if self.fail_on == Some(counter) {
                return Err(DbError::Internal("timeout".into()));
            }
            let position = LiveCounter::ALL
                .iter()
                .position(|c| *c == counter)
                .unwrap_or_default();
            Ok(position as i64 * 10)
        }
    }

    #[tokio::test]
    async fn test_get_wraps_count_as_string() {
        let service = CounterService::new(Arc::new(PositionRepo { fail_on: None }));

        let counter = service.get(LiveCounter::Notes).await.unwrap();
        assert_eq!(counter.label, "Number of notes submitted");
        assert_eq!(counter.value, "40");
    }

    #[tokio::test]
    async fn test_all_keeps_fixed_order() {
        let service = CounterService::new(Arc::new(PositionRepo { fail_on: None }));

        let counters = service.all().await.unwrap();
        let values: Vec<_> = counters.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, ["0", "10", "20", "30", "40", "50"]);
        assert_eq!(counters[0].label, "Number of answers submitted");
        assert_eq!(counters[5].label, "Number of Counties visited");
    }

    #[tokio::test]
    async fn test_all_propagates_failure() {
        let service = CounterService::new(Arc::new(PositionRepo {
            fail_on: Some(LiveCounter::FlaggedAnswers),
        }));

        assert!(service.all().await.is_err());
        assert!(service.get(LiveCounter::Answers).await.is_ok());
    }
}
