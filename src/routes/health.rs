//! Health check endpoints for Kubernetes probes and monitoring.

use axum::{Json, extract::State, response::IntoResponse};
use http::StatusCode;
use serde::Serialize;

use crate::{AppState, observability::metrics};

/// Detailed health status response.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Overall status: "healthy" or "unhealthy"
    pub status: String,
    pub version: String,
    pub subsystems: SubsystemStatus,
}

#[derive(Debug, Serialize)]
pub struct SubsystemStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<ComponentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<ComponentStatus>,
}

/// Status of a single component.
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Latency of the health check in milliseconds
    pub latency_ms: u64,
}

/// Full health check with subsystem status.
///
/// An unreachable database makes the service unhealthy. An unreachable cache
/// only degrades it, since statistics are then computed on every request.
#[tracing::instrument(name = "health.check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let mut overall_healthy = true;
    let mut subsystems = SubsystemStatus {
        database: None,
        cache: None,
    };

    if let Some(db) = &state.db {
        let start = std::time::Instant::now();
        let db_healthy = db.health_check().await.is_ok();

        overall_healthy &= db_healthy;
        subsystems.database = Some(ComponentStatus {
            healthy: db_healthy,
            message: (!db_healthy).then(|| "Database connection failed".to_string()),
            latency_ms: start.elapsed().as_millis() as u64,
        });
    }

    if let Some(cache) = &state.cache {
        let start = std::time::Instant::now();
        let cache_healthy = cache.get_bytes("__health_check__").await.is_ok();

        subsystems.cache = Some(ComponentStatus {
            healthy: cache_healthy,
            message: (!cache_healthy).then(|| "Cache connection failed".to_string()),
            latency_ms: start.elapsed().as_millis() as u64,
        });
    }

    let (status, status_code) = if overall_healthy {
        ("healthy", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    let health = HealthStatus {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        subsystems,
    };

    (status_code, Json(health))
}

/// Kubernetes liveness probe.
#[tracing::instrument(name = "health.liveness")]
pub async fn liveness() -> impl IntoResponse {
    StatusCode::OK
}

/// Kubernetes readiness probe. Not ready while the database is unreachable.
#[tracing::instrument(name = "health.readiness", skip(state))]
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(db) = &state.db
        && db.health_check().await.is_err()
    {
        return StatusCode::SERVICE_UNAVAILABLE;
    }

    StatusCode::OK
}

/// Prometheus metrics endpoint.
#[tracing::instrument(name = "health.metrics")]
pub async fn metrics() -> impl IntoResponse {
    match metrics::render() {
        Some(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        ),
        None if cfg!(feature = "prometheus") => (
            StatusCode::SERVICE_UNAVAILABLE,
            [("content-type", "text/plain")],
            "Metrics not initialized".to_string(),
        ),
        None => (
            StatusCode::NOT_FOUND,
            [("content-type", "text/plain")],
            "Prometheus metrics not enabled".to_string(),
        ),
    }
}

#[cfg(all(test, feature = "database-sqlite"))]
mod tests {
    use http::StatusCode;

    use crate::routes::test_support::{get_json, test_app, test_app_no_db};

    #[tokio::test]
    async fn test_health_with_database() {
        let (app, _) = test_app(false).await;
        let (status, json) = get_json(&app, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["subsystems"]["database"]["healthy"], true);
        assert_eq!(json["subsystems"]["cache"]["healthy"], true);
    }

    #[tokio::test]
    async fn test_health_with_closed_database_is_unhealthy() {
        let (app, pool) = test_app(false).await;
        pool.close().await;

        let (status, json) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["status"], "unhealthy");

        let (status, _) = get_json(&app, "/health/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_probes_without_database() {
        let app = test_app_no_db().await;

        let (status, json) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["subsystems"].get("database").is_none());

        assert_eq!(get_json(&app, "/health/live").await.0, StatusCode::OK);
        assert_eq!(get_json(&app, "/health/ready").await.0, StatusCode::OK);
    }
}
