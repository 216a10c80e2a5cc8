//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use quizflow_api::state::AppState;
use quizflow_catalog::application::catalog::QuizCatalog;
use quizflow_core::clock::Clock;
use quizflow_orchestrator::{Collaborators, EngineConfig};
use quizflow_store::PgSessionStore;
use quizflow_test_support::{FixedClock, ScriptedCollaborators, linear_quiz, rule_table_quiz};
use sqlx::PgPool;
use tower::ServiceExt;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Build application state backed by a real `PgSessionStore` and scripted
/// collaborators.
pub fn build_test_state(pool: PgPool) -> AppState {
    let catalog = QuizCatalog::from_definitions([linear_quiz(), rule_table_quiz()]).unwrap();
    AppState::new(
        catalog,
        Arc::new(PgSessionStore::new(pool)),
        fixed_clock(),
        Collaborators::all(Arc::new(ScriptedCollaborators::new())),
        EngineConfig::default(),
    )
}

/// Build the full app router. Uses the same route structure as `main.rs`.
pub fn build_test_app(pool: PgPool) -> Router {
    quizflow_api::app(build_test_state(pool))
}

/// Send a POST request with an optional JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: Option<&serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method("POST").uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
