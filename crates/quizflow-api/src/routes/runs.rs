//! Routes driving a participant's run through a quiz.

use axum::extract::{Path, State};
use axum::{
    Json, Router,
    routing::{get, post},
};
use quizflow_core::quiz::Personalization;
use quizflow_core::response::Answer;
use quizflow_orchestrator::{Screen, SubmitOutcome};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::state::AppState;

/// Path parameters shared by every run route.
#[derive(Debug, Deserialize)]
pub struct RunPath {
    /// Quiz identifier.
    pub quiz_id: String,
    /// Participant session token.
    pub participant: String,
}

/// Response body returned by every run action.
#[derive(Debug, Serialize)]
pub struct RunResponse {
    /// `"advanced"`, `"ignored"`, or `"discarded"`.
    pub outcome: &'static str,
    /// The screen now showing.
    pub screen: Screen,
}

impl RunResponse {
    fn advanced(screen: Screen) -> Self {
        Self {
            outcome: "advanced",
            screen,
        }
    }

    fn from_outcome(outcome: SubmitOutcome, current: impl FnOnce() -> Screen) -> Self {
        match outcome {
            SubmitOutcome::Advanced(screen) => Self::advanced(screen),
            SubmitOutcome::Ignored => Self {
                outcome: "ignored",
                screen: current(),
            },
            SubmitOutcome::Discarded => Self {
                outcome: "discarded",
                screen: current(),
            },
        }
    }
}

/// GET /{quiz_id}/{participant}
#[instrument(skip(state, path), fields(quiz_id = %path.quiz_id))]
async fn current_screen(
    State(state): State<AppState>,
    Path(path): Path<RunPath>,
) -> Result<Json<Screen>, ApiError> {
    let run = state.run(&path.quiz_id, &path.participant).await?;
    Ok(Json(run.screen()))
}

/// POST /{quiz_id}/{participant}/begin
#[instrument(skip(state, path), fields(quiz_id = %path.quiz_id))]
async fn begin(
    State(state): State<AppState>,
    Path(path): Path<RunPath>,
) -> Result<Json<RunResponse>, ApiError> {
    let run = state.run(&path.quiz_id, &path.participant).await?;
    let outcome = run.begin().await?;
    Ok(Json(RunResponse::from_outcome(outcome, || run.screen())))
}

/// POST /{quiz_id}/{participant}/personalization
#[instrument(skip(state, path, data), fields(quiz_id = %path.quiz_id))]
async fn submit_personalization(
    State(state): State<AppState>,
    Path(path): Path<RunPath>,
    Json(data): Json<Personalization>,
) -> Result<Json<RunResponse>, ApiError> {
    let run = state.run(&path.quiz_id, &path.participant).await?;
    let outcome = run.submit_personalization(data).await?;
    Ok(Json(RunResponse::from_outcome(outcome, || run.screen())))
}

/// POST /{quiz_id}/{participant}/answer
#[instrument(skip(state, path, answer), fields(quiz_id = %path.quiz_id))]
async fn submit_answer(
    State(state): State<AppState>,
    Path(path): Path<RunPath>,
    Json(answer): Json<Answer>,
) -> Result<Json<RunResponse>, ApiError> {
    let run = state.run(&path.quiz_id, &path.participant).await?;
    let outcome = run.submit_answer(answer).await?;
    if outcome == SubmitOutcome::Ignored {
        info!("duplicate submission ignored");
    }
    Ok(Json(RunResponse::from_outcome(outcome, || run.screen())))
}

/// POST /{quiz_id}/{participant}/retry-analysis
#[instrument(skip(state, path), fields(quiz_id = %path.quiz_id))]
async fn retry_analysis(
    State(state): State<AppState>,
    Path(path): Path<RunPath>,
) -> Result<Json<RunResponse>, ApiError> {
    let run = state.run(&path.quiz_id, &path.participant).await?;
    let outcome = run.retry_analysis().await?;
    Ok(Json(RunResponse::from_outcome(outcome, || run.screen())))
}

/// POST /{quiz_id}/{participant}/restart
#[instrument(skip(state, path), fields(quiz_id = %path.quiz_id))]
async fn restart(
    State(state): State<AppState>,
    Path(path): Path<RunPath>,
) -> Result<Json<RunResponse>, ApiError> {
    let run = state.run(&path.quiz_id, &path.participant).await?;
    Ok(Json(RunResponse::advanced(run.restart().await)))
}

/// POST /{quiz_id}/{participant}/recommendation
#[instrument(skip(state, path), fields(quiz_id = %path.quiz_id))]
async fn show_recommendation(
    State(state): State<AppState>,
    Path(path): Path<RunPath>,
) -> Result<Json<RunResponse>, ApiError> {
    let run = state.run(&path.quiz_id, &path.participant).await?;
    let outcome = run.show_recommendation().await?;
    Ok(Json(RunResponse::from_outcome(outcome, || run.screen())))
}

/// POST /{quiz_id}/{participant}/recommendation/close
#[instrument(skip(state, path), fields(quiz_id = %path.quiz_id))]
async fn close_recommendation(
    State(state): State<AppState>,
    Path(path): Path<RunPath>,
) -> Result<Json<RunResponse>, ApiError> {
    let run = state.run(&path.quiz_id, &path.participant).await?;
    Ok(Json(RunResponse::advanced(run.close_recommendation()?)))
}

/// Returns the router for participant runs.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{quiz_id}/{participant}", get(current_screen))
        .route("/{quiz_id}/{participant}/begin", post(begin))
        .route(
            "/{quiz_id}/{participant}/personalization",
            post(submit_personalization),
        )
        .route("/{quiz_id}/{participant}/answer", post(submit_answer))
        .route(
            "/{quiz_id}/{participant}/retry-analysis",
            post(retry_analysis),
        )
        .route("/{quiz_id}/{participant}/restart", post(restart))
        .route(
            "/{quiz_id}/{participant}/recommendation",
            post(show_recommendation),
        )
        .route(
            "/{quiz_id}/{participant}/recommendation/close",
            post(close_recommendation),
        )
}
