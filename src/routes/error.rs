use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::{db::DbError, services::StatisticsError};

/// Standard error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorInfo,
}

/// `{"type": "...", "message": "...", "code": "..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error class: "invalid_request_error", "service_unavailable" or "server_error"
    #[serde(rename = "type")]
    pub error_type: String,
    /// Human-readable error message
    pub message: String,
    /// Machine-readable error code
    pub code: String,
}

/// Error response for API requests.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_parameter", message)
    }

    pub fn database_required() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "database_required",
            "Database not configured",
        )
    }

    fn error_type(&self) -> &'static str {
        if self.status == StatusCode::SERVICE_UNAVAILABLE {
            "service_unavailable"
        } else if self.status.is_server_error() {
            "server_error"
        } else {
            "invalid_request_error"
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorInfo {
                error_type: self.error_type().to_string(),
                message: self.message,
                code: self.code.to_string(),
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotConfigured => Self::database_required(),
            _ => {
                tracing::error!(error = %err, "Database error");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "An internal database error occurred",
                )
            }
        }
    }
}

impl From<StatisticsError> for ApiError {
    fn from(err: StatisticsError) -> Self {
        match err {
            StatisticsError::Database(db_err) => db_err.into(),
            StatisticsError::Cancelled => {
                tracing::info!("Statistics request cancelled");
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "request_cancelled",
                    "The request was cancelled before statistics were computed",
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_database_error_hides_details() {
        let err: ApiError =
            StatisticsError::Database(DbError::Internal("password=hunter2".into())).into();
        let (status, json) = body_json(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["type"], "server_error");
        assert_eq!(json["error"]["code"], "database_error");
        assert!(!json.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn test_cancelled_is_service_unavailable() {
        let (status, json) = body_json(StatisticsError::Cancelled.into()).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["error"]["type"], "service_unavailable");
        assert_eq!(json["error"]["code"], "request_cancelled");
    }

    #[tokio::test]
    async fn test_bad_request_shape() {
        let (status, json) = body_json(ApiError::bad_request("page must be a number")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["type"], "invalid_request_error");
        assert_eq!(json["error"]["message"], "page must be a number");
    }
}
