use std::time::Instant;

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::{
    db::{error::DbResult, repos::StatisticsRepo},
    models::{AggregateRow, GroupingMode, LiveCounter, ScopeKey},
    observability::metrics,
};

const OBSERVERS_PER_COUNTY: &str = r#"
    SELECT
        a.county_code AS code,
        COALESCE(c.name, a.county_code) AS label,
        COUNT(DISTINCT a.observer_id)::BIGINT AS value
    FROM answers a
    JOIN observers o ON o.id = a.observer_id
    LEFT JOIN counties c ON c.code = a.county_code
    WHERE ($1 OR o.ngo_id = $2)
    GROUP BY a.county_code, c.name
    ORDER BY value DESC, a.county_code
"#;

const FLAGGED_PER_POLLING_STATION: &str = r#"
    SELECT
        a.county_code AS code,
        a.polling_station_number::TEXT AS label,
        COUNT(*)::BIGINT AS value
    FROM answers a
    JOIN observers o ON o.id = a.observer_id
    JOIN form_options f ON f.id = a.option_id
    WHERE f.flagged
        AND ($1 OR o.ngo_id = $2)
    GROUP BY a.county_code, a.polling_station_number
    ORDER BY value DESC, a.county_code, a.polling_station_number
"#;

fn counter_sql(counter: LiveCounter) -> &'static str {
    match counter {
        LiveCounter::Answers => "SELECT COUNT(*)::BIGINT FROM answers",
        LiveCounter::Stations => {
            "SELECT COUNT(DISTINCT polling_station_id)::BIGINT FROM answers"
        }
        LiveCounter::FlaggedAnswers => {
            "SELECT COUNT(*)::BIGINT FROM answers a \
             JOIN form_options f ON f.id = a.option_id \
             WHERE f.flagged"
        }
        LiveCounter::LoggedInObservers => {
            "SELECT COUNT(DISTINCT observer_id)::BIGINT FROM polling_station_infos"
        }
        LiveCounter::Notes => "SELECT COUNT(*)::BIGINT FROM notes",
        LiveCounter::Counties => "SELECT COUNT(DISTINCT county_code)::BIGINT FROM answers",
    }
}

/// Statistics queries against PostgreSQL. Reads go to the replica when one
/// is configured.
pub struct PostgresStatisticsRepo {
    read_pool: PgPool,
}

impl PostgresStatisticsRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        Self {
            read_pool: read_pool.unwrap_or(write_pool),
        }
    }
}

#[async_trait]
impl StatisticsRepo for PostgresStatisticsRepo {
    async fn run_aggregate_query(
        &self,
        mode: GroupingMode,
        scope: ScopeKey,
    ) -> DbResult<Vec<AggregateRow>> {
        let sql = match mode {
            GroupingMode::County => OBSERVERS_PER_COUNTY,
            GroupingMode::PollingStation => FLAGGED_PER_POLLING_STATION,
        };

        let started = Instant::now();
        let result = sqlx::query(sql)
            .bind(scope.is_organizer)
            .bind(scope.ngo_id)
            .fetch_all(&self.read_pool)
            .await;
        metrics::record_db_operation(
            "aggregate",
            "answers",
            started.elapsed().as_secs_f64(),
            result.is_ok(),
        );

        Ok(result?
            .iter()
            .map(|row| AggregateRow {
                label: row.get("label"),
                code: row.get("code"),
                value: row.get("value"),
            })
            .collect())
    }

    async fn count(&self, counter: LiveCounter) -> DbResult<i64> {
        let started = Instant::now();
        let result = sqlx::query_scalar::<_, i64>(counter_sql(counter))
            .fetch_one(&self.read_pool)
            .await;
        metrics::record_db_operation(
            "count",
            counter.as_str(),
            started.elapsed().as_secs_f64(),
            result.is_ok(),
        );

        Ok(result?)
    }
}
