//! Chooses the display text for a question.

use std::time::Duration;

use quizflow_core::gateway::{AdaptNarrativeRequest, NarrativeAdapter, call_with_timeout};
use quizflow_core::quiz::{Personalization, QuizDefinition};
use quizflow_core::response::Response;
use tracing::{debug, warn};

/// Returns the text to show for the question at `index`.
///
/// The adapter is consulted only when the quiz has a story setup and at
/// least one response exists to continue from. Any failure, timeout, or
/// blank reply falls back to the question's base narrative. An index past
/// the end yields an empty string.
pub async fn display_text(
    quiz: &QuizDefinition,
    index: usize,
    responses: &[Response],
    personalization: Option<&Personalization>,
    adapter: Option<&dyn NarrativeAdapter>,
    timeout: Duration,
) -> String {
    let Some(question) = quiz.question(index) else {
        return String::new();
    };
    let base = question.base_narrative().to_owned();

    let (Some(story_setup), Some(adapter)) = (quiz.story_setup.as_ref(), adapter) else {
        return base;
    };
    if responses.is_empty() {
        return base;
    }

    let request = AdaptNarrativeRequest {
        base_scenario: base.clone(),
        previous_responses: responses.to_vec(),
        story_setup: story_setup.clone(),
        personalization_data: personalization.cloned(),
    };

    match call_with_timeout(timeout, adapter.adapt(request)).await {
        Ok(text) if !text.trim().is_empty() => {
            debug!(quiz_id = %quiz.id, question_id = %question.id, "adapted narrative");
            text
        }
        Ok(_) => {
            warn!(quiz_id = %quiz.id, question_id = %question.id, "blank adaptation, using base text");
            base
        }
        Err(e) => {
            warn!(quiz_id = %quiz.id, question_id = %question.id, error = %e, "narrative adaptation failed, using base text");
            base
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use quizflow_core::gateway::GatewayError;
    use quizflow_test_support::{ScriptedCollaborators, linear_quiz, mediated_quiz};

    const LIMIT: Duration = Duration::from_secs(1);

    fn response() -> Response {
        Response {
            question_index: 0,
            question_id: "m1".to_owned(),
            question_text: "How do you greet a stranger?".to_owned(),
            selected_label: "Wave back".to_owned(),
            value: "wave".to_owned(),
            is_custom: false,
            answered_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_adapts_text_once_responses_exist() {
        // Arrange
        let quiz = mediated_quiz(false);
        let adapter = ScriptedCollaborators::new().with_adapt(Ok("The stall keeper smiles.".to_owned()));
        let responses = vec![response()];

        // Act
        let text = display_text(&quiz, 1, &responses, None, Some(&adapter), LIMIT).await;

        // Assert
        assert_eq!(text, "The stall keeper smiles.");
        let requests = adapter.adapts();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].base_scenario, "Which stall do you visit?");
        assert_eq!(requests[0].story_setup, "A lantern-lit market at dusk.");
        assert_eq!(requests[0].previous_responses, responses);
    }

    #[tokio::test]
    async fn test_first_question_uses_base_narrative_without_calling_adapter() {
        let quiz = mediated_quiz(false);
        let adapter = ScriptedCollaborators::new();

        let text = display_text(&quiz, 0, &[], None, Some(&adapter), LIMIT).await;

        assert_eq!(text, "A stranger waves from across the square.");
        assert!(adapter.adapts().is_empty());
    }

    #[tokio::test]
    async fn test_adapter_failure_falls_back_to_base_text() {
        let quiz = mediated_quiz(false);
        let adapter = ScriptedCollaborators::new()
            .with_adapt(Err(GatewayError::Status { status: 503, body: String::new() }));

        let text = display_text(&quiz, 1, &[response()], None, Some(&adapter), LIMIT).await;

        assert_eq!(text, "Which stall do you visit?");
    }

    #[tokio::test]
    async fn test_blank_adaptation_falls_back_to_base_text() {
        let quiz = mediated_quiz(false);
        let adapter = ScriptedCollaborators::new().with_adapt(Ok("   ".to_owned()));

        let text = display_text(&quiz, 1, &[response()], None, Some(&adapter), LIMIT).await;

        assert_eq!(text, "Which stall do you visit?");
    }

    #[tokio::test]
    async fn test_quiz_without_story_setup_never_adapts() {
        let quiz = linear_quiz();
        let adapter = ScriptedCollaborators::new();

        let text = display_text(&quiz, 1, &[response()], None, Some(&adapter), LIMIT).await;

        assert_eq!(text, "Base text for q2");
        assert!(adapter.adapts().is_empty());
    }
}
