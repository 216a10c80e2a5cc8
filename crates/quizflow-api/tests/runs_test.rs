//! Integration tests for participant runs.

mod common;

use axum::http::StatusCode;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../migrations")]
async fn test_branching_run_persists_path_and_result(pool: PgPool) {
    let state = common::build_test_state(pool.clone());
    let choice = |value: &str| serde_json::json!({ "type": "choice", "value": value });

    // Step 1: begin
    let app = quizflow_api::app(state.clone());
    let (status, json) = common::post_json(app, "/api/v1/runs/trail/tok-1/begin", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["screen"]["question_id"], "q1");

    // Step 2: answer q1, then take the branch from q2 straight to q4
    for value in ["a", "c"] {
        let app = quizflow_api::app(state.clone());
        let (status, _) =
            common::post_json(app, "/api/v1/runs/trail/tok-1/answer", Some(&choice(value))).await;
        assert_eq!(status, StatusCode::OK);
    }
    let app = quizflow_api::app(state.clone());
    let (_, json) = common::get_json(app, "/api/v1/runs/trail/tok-1").await;
    assert_eq!(json["screen"], "question");
    assert_eq!(json["question_id"], "q4");

    // Step 3: final answer completes the run
    let app = quizflow_api::app(state.clone());
    let (status, json) =
        common::post_json(app, "/api/v1/runs/trail/tok-1/answer", Some(&choice("a"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["screen"]["screen"], "results");

    // Verify the persisted snapshot
    let (snapshot,): (serde_json::Value,) = sqlx::query_as(
        "SELECT snapshot FROM quiz_sessions WHERE participant = 'tok-1' AND quiz_id = 'trail'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(snapshot["path"], serde_json::json!(["q1", "q2", "q4"]));
    assert_eq!(snapshot["responses"].as_array().unwrap().len(), 3);
    assert_eq!(snapshot["result"]["outcome"]["category_id"], "ridge");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_new_server_state_resumes_persisted_run(pool: PgPool) {
    // Arrange: progress through one question on one state
    let first = common::build_test_state(pool.clone());
    common::post_json(quizflow_api::app(first.clone()), "/api/v1/runs/letters/tok-2/begin", None)
        .await;
    common::post_json(
        quizflow_api::app(first),
        "/api/v1/runs/letters/tok-2/answer",
        Some(&serde_json::json!({ "type": "choice", "value": "y" })),
    )
    .await;

    // Act: a fresh state mounts from the database
    let app = common::build_test_app(pool);
    let (status, json) = common::get_json(app, "/api/v1/runs/letters/tok-2").await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["screen"], "question");
    assert_eq!(json["question_id"], "second");
    assert_eq!(json["step"], 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_restart_removes_persisted_row(pool: PgPool) {
    let state = common::build_test_state(pool.clone());
    common::post_json(quizflow_api::app(state.clone()), "/api/v1/runs/trail/tok-3/begin", None)
        .await;

    let (status, json) =
        common::post_json(quizflow_api::app(state), "/api/v1/runs/trail/tok-3/restart", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["screen"]["screen"], "welcome");
    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM quiz_sessions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 0);
}
