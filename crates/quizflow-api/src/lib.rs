//! Quizflow — HTTP API.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::Router;

use crate::state::AppState;

/// Builds the application router without transport layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/quizzes", routes::quizzes::router())
        .nest("/api/v1/runs", routes::runs::router())
        .with_state(state)
}
