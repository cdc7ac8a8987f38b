//! Reporting backend for election monitoring.
//!
//! Serves scope-aware aggregate statistics over observer submissions. Grouped
//! aggregates are computed by the database, cached per (grouping, caller
//! scope) and paginated per request; dashboard counters are always live.

use std::sync::Arc;

use axum::{Router, routing::get};
use tokio_util::sync::CancellationToken;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

pub mod cache;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;

use crate::{
    cache::Cache,
    config::{AppConfig, DatabaseConfig},
    db::DbPool,
    services::Services,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Option<Arc<DbPool>>,
    pub cache: Option<Arc<dyn Cache>>,
    /// `None` without a database.
    pub services: Option<Services>,
    /// Cancelled on shutdown. Each statistics request runs under a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Connect to the configured database and cache.
    ///
    /// Migrations run here when the database config asks for them.
    pub async fn new(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let db = match &config.database {
            DatabaseConfig::None => {
                tracing::warn!("No database configured, statistics endpoints are unavailable");
                None
            }
            _ => {
                let pool = DbPool::from_config(&config.database).await?;
                if DbPool::should_run_migrations(&config.database) {
                    pool.run_migrations().await?;
                }
                Some(Arc::new(pool))
            }
        };

        let cache = cache::from_config(&config.cache)?;

        Ok(Self::from_parts(config, db, cache))
    }

    /// Assemble state from already-built components.
    pub fn from_parts(
        config: AppConfig,
        db: Option<Arc<DbPool>>,
        cache: Option<Arc<dyn Cache>>,
    ) -> Self {
        #[cfg(any(feature = "database-sqlite", feature = "database-postgres"))]
        let services = db
            .as_ref()
            .map(|db| Services::new(db.statistics(), cache.clone(), &config.statistics));
        #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
        let services: Option<Services> = None;

        Self {
            config: Arc::new(config),
            db,
            cache,
            services,
            shutdown: CancellationToken::new(),
        }
    }
}

/// Build the HTTP router.
pub fn build_app(config: &AppConfig, state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/health/live", get(routes::health::liveness))
        .route("/health/ready", get(routes::health::readiness));

    if config.observability.metrics.enabled {
        app = app.route(
            &config.observability.metrics.path,
            get(routes::health::metrics),
        );
    }

    app = app.nest("/api/v1/statistics", routes::statistics_routes());

    if let Some(cors) = config.server.cors.clone().into_layer() {
        app = app.layer(cors);
    }

    app.layer(axum::middleware::from_fn(
        middleware::request_context_middleware,
    ))
    .layer(TraceLayer::new_for_http())
    .layer(RequestBodyLimitLayer::new(config.server.body_limit_bytes))
    .with_state(state)
}
