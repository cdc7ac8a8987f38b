pub mod error;
pub mod health;
pub mod statistics;

use axum::{Router, routing::get};

pub use error::ApiError;

use crate::AppState;

/// Routes nested under `/api/v1/statistics`.
pub fn statistics_routes() -> Router<AppState> {
    Router::new()
        .route("/grouped", get(statistics::grouped_statistics))
        .route("/number-of-observers", get(statistics::number_of_observers))
        .route("/mini/all", get(statistics::mini_all))
        .route("/mini/{counter}", get(statistics::mini_counter))
}
