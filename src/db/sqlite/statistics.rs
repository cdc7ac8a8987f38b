use std::time::Instant;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::{
    db::{error::DbResult, repos::StatisticsRepo},
    models::{AggregateRow, GroupingMode, LiveCounter, ScopeKey},
    observability::metrics,
};

/// Distinct observers per county. `?1` is the organizer flag, `?2` the NGO.
const OBSERVERS_PER_COUNTY: &str = r#"
    SELECT
        a.county_code AS code,
        COALESCE(c.name, a.county_code) AS label,
        COUNT(DISTINCT a.observer_id) AS value
    FROM answers a
    JOIN observers o ON o.id = a.observer_id
    LEFT JOIN counties c ON c.code = a.county_code
    WHERE (?1 = 1 OR o.ngo_id = ?2)
    GROUP BY a.county_code, c.name
    ORDER BY value DESC, a.county_code
"#;

/// Flagged answers per (county, polling station).
const FLAGGED_PER_POLLING_STATION: &str = r#"
    SELECT
        a.county_code AS code,
        CAST(a.polling_station_number AS TEXT) AS label,
        COUNT(*) AS value
    FROM answers a
    JOIN observers o ON o.id = a.observer_id
    JOIN form_options f ON f.id = a.option_id
    WHERE f.flagged = 1
        AND (?1 = 1 OR o.ngo_id = ?2)
    GROUP BY a.county_code, a.polling_station_number
    ORDER BY value DESC, a.county_code, a.polling_station_number
"#;

fn counter_sql(counter: LiveCounter) -> &'static str {
    match counter {
        LiveCounter::Answers => "SELECT COUNT(*) FROM answers",
        LiveCounter::Stations => "SELECT COUNT(DISTINCT polling_station_id) FROM answers",
        LiveCounter::FlaggedAnswers => {
            "SELECT COUNT(*) FROM answers a \
             JOIN form_options f ON f.id = a.option_id \
             WHERE f.flagged = 1"
        }
        LiveCounter::LoggedInObservers => {
            "SELECT COUNT(DISTINCT observer_id) FROM polling_station_infos"
        }
        LiveCounter::Notes => "SELECT COUNT(*) FROM notes",
        LiveCounter::Counties => "SELECT COUNT(DISTINCT county_code) FROM answers",
    }
}

pub struct SqliteStatisticsRepo {
    pool: SqlitePool,
}

impl SqliteStatisticsRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatisticsRepo for SqliteStatisticsRepo {
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
            .fetch_all(&self.pool)
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
            .fetch_one(&self.pool)
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
