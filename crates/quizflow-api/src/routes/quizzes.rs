//! Quiz catalog endpoints.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get};
use quizflow_catalog::application::catalog::QuizSummary;
use quizflow_core::quiz::PersonalizationField;
use serde::Serialize;
use tracing::instrument;

use crate::error::ApiError;
use crate::state::AppState;

/// Response body for GET /{quiz_id}.
#[derive(Debug, Serialize)]
pub struct QuizDetail {
    /// Listing fields.
    #[serde(flatten)]
    pub summary: QuizSummary,
    /// Personalization fields collected before the first question.
    pub personalization: Vec<PersonalizationField>,
    /// Whether question text is adapted between steps.
    pub adapts_narrative: bool,
}

/// GET /
async fn list_quizzes(State(state): State<AppState>) -> Json<Vec<QuizSummary>> {
    Json(state.catalog.summaries())
}

/// GET /{quiz_id}
#[instrument(skip(state))]
async fn get_quiz(
    State(state): State<AppState>,
    Path(quiz_id): Path<String>,
) -> Result<Json<QuizDetail>, ApiError> {
    let quiz = state.catalog.get(&quiz_id)?;
    let summary = state.catalog.summary(&quiz_id)?;

    Ok(Json(QuizDetail {
        summary,
        personalization: quiz
            .personalization
            .as_ref()
            .map(|step| step.fields.clone())
            .unwrap_or_default(),
        adapts_narrative: quiz.adapts_narrative(),
    }))
}

/// Returns the router for the quiz catalog.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_quizzes))
        .route("/{quiz_id}", get(get_quiz))
}
