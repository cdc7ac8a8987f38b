//! Statistics endpoints.
//!
//! Grouped aggregates are scope-filtered, cached and paginated. The `mini`
//! counters are global and always live.

use axum::{
    Json,
    extract::{
        FromRequestParts, Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
};
use http::{StatusCode, request::Parts};
use serde::Deserialize;

use super::error::ApiError;
use crate::{
    AppState,
    models::{
        AggregateRow, DEFAULT_PAGE, DEFAULT_PAGE_SIZE, GroupingMode, LabeledCounter, LiveCounter,
        PageRequest, PagedResult, ScopeKey,
    },
    services::Services,
};

/// Caller scope for the current request.
///
/// An upstream auth layer attaches a [`ScopeKey`] extension; without one the
/// configured default NGO and organizer flag apply.
#[derive(Debug, Clone, Copy)]
pub struct RequestScope(pub ScopeKey);

impl FromRequestParts<AppState> for RequestScope {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let scope = parts
            .extensions
            .get::<ScopeKey>()
            .copied()
            .unwrap_or_else(|| state.config.statistics.default_scope());
        Ok(Self(scope))
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageQuery {
    fn into_request(self) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(DEFAULT_PAGE),
            self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct GroupedQuery {
    #[serde(default = "default_group_by")]
    pub group_by: GroupingMode,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

fn default_group_by() -> GroupingMode {
    GroupingMode::County
}

fn services(state: &AppState) -> Result<&Services, ApiError> {
    state.services.as_ref().ok_or_else(ApiError::database_required)
}

async fn grouped(
    state: &AppState,
    mode: GroupingMode,
    scope: ScopeKey,
    page: PageRequest,
) -> Result<Json<PagedResult<AggregateRow>>, ApiError> {
    let cancel = state.shutdown.child_token();
    let result = services(state)?
        .statistics
        .get_grouped_statistics(mode, scope, page, &cancel)
        .await?;
    Ok(Json(result))
}

/// `GET /grouped?group_by=county|polling_station&page=&page_size=`
#[tracing::instrument(name = "statistics.grouped", skip(state, query))]
pub async fn grouped_statistics(
    State(state): State<AppState>,
    RequestScope(scope): RequestScope,
    query: Result<Query<GroupedQuery>, QueryRejection>,
) -> Result<Json<PagedResult<AggregateRow>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let page = PageQuery {
        page: query.page,
        page_size: query.page_size,
    };
    grouped(&state, query.group_by, scope, page.into_request()).await
}

/// `GET /number-of-observers?page=&page_size=`: observers per county.
#[tracing::instrument(name = "statistics.number_of_observers", skip(state, query))]
pub async fn number_of_observers(
    State(state): State<AppState>,
    RequestScope(scope): RequestScope,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<PagedResult<AggregateRow>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    grouped(&state, GroupingMode::County, scope, query.into_request()).await
}

/// `GET /mini/{counter}`
#[tracing::instrument(name = "statistics.mini", skip(state, counter))]
pub async fn mini_counter(
    State(state): State<AppState>,
    counter: Result<Path<LiveCounter>, PathRejection>,
) -> Result<Json<LabeledCounter>, ApiError> {
    let Path(counter) = counter.map_err(|_| {
        ApiError::new(
            StatusCode::NOT_FOUND,
            "unknown_counter",
            "Unknown counter",
        )
    })?;
    Ok(Json(services(&state)?.counters.get(counter).await?))
}

/// `GET /mini/all`: every counter, in dashboard order.
#[tracing::instrument(name = "statistics.mini_all", skip(state))]
pub async fn mini_all(State(state): State<AppState>) -> Result<Json<Vec<LabeledCounter>>, ApiError> {
    Ok(Json(services(&state)?.counters.all().await?))
}
