//! Result computation.

use std::time::Duration;

use chrono::{DateTime, Utc};
use quizflow_core::error::DomainError;
use quizflow_core::gateway::{
    ExplainRequest, ExplainSubject, ResultReasoner, SelectArchetypeRequest, call_with_timeout,
};
use quizflow_core::quiz::{QuizDefinition, QuizKind, RuleTable, WordMatrix};
use quizflow_core::response::{Decision, Outcome, ResultRecord, Response};
use tracing::{info, instrument, warn};

use crate::domain::mediated::{parse_selection, transcript};
use crate::domain::rule_table::{tally, winner};

/// Everything a scoring run needs.
#[derive(Clone, Copy)]
pub struct ScoringContext<'a> {
    /// The quiz being scored.
    pub quiz: &'a QuizDefinition,
    /// Every response of the run, in order.
    pub responses: &'a [Response],
    /// Remote session handle, when one exists.
    pub session_id: Option<&'a str>,
    /// External reasoning service. Required for mediated quizzes.
    pub reasoner: Option<&'a dyn ResultReasoner>,
    /// Per-call timeout for external calls.
    pub timeout: Duration,
    /// Timestamp recorded on the result.
    pub now: DateTime<Utc>,
}

/// Computes the result of a completed run, dispatching on the quiz kind.
///
/// # Errors
///
/// Returns `DomainError::Analysis` when mediated selection fails (transport
/// failure, timeout, or a malformed reply). Rule-table scoring fails only
/// for a table without categories, reported as
/// `DomainError::Configuration`.
#[instrument(skip_all, fields(quiz_id = %ctx.quiz.id, responses = ctx.responses.len()))]
pub async fn compute_result(ctx: ScoringContext<'_>) -> Result<ResultRecord, DomainError> {
    let (outcome, explanation) = match &ctx.quiz.scoring {
        QuizKind::RuleTable(table) => score_rule_table(&ctx, table).await?,
        QuizKind::Mediated(matrix) => score_mediated(&ctx, matrix).await?,
    };

    Ok(ResultRecord {
        outcome,
        explanation,
        responses: ctx.responses.to_vec(),
        computed_at: ctx.now,
    })
}

async fn score_rule_table(
    ctx: &ScoringContext<'_>,
    table: &RuleTable,
) -> Result<(Outcome, String), DomainError> {
    let scores = tally(table, ctx.responses);
    let category = winner(table, &scores).ok_or_else(|| {
        DomainError::Configuration(format!("quiz '{}' has no categories", ctx.quiz.id))
    })?;
    info!(category_id = %category.id, "rule table winner");

    let explanation = explain_or(
        ctx,
        ExplainSubject::Category {
            category_id: category.id.clone(),
        },
        &category.description,
    )
    .await;

    Ok((
        Outcome::Category {
            category_id: category.id.clone(),
            name: category.name.clone(),
            description: category.description.clone(),
            scores,
        },
        explanation,
    ))
}

async fn score_mediated(
    ctx: &ScoringContext<'_>,
    matrix: &WordMatrix,
) -> Result<(Outcome, String), DomainError> {
    let reasoner = ctx.reasoner.ok_or_else(|| {
        DomainError::Analysis("no reasoning service is configured".to_owned())
    })?;

    let request = SelectArchetypeRequest {
        session_id: ctx.session_id.map(str::to_owned),
        quiz_id: ctx.quiz.id.clone(),
        responses: transcript(ctx.responses),
        word_matrix: matrix.clone(),
    };
    let raw = call_with_timeout(ctx.timeout, reasoner.select_archetype(request))
        .await
        .map_err(|e| DomainError::Analysis(format!("archetype selection failed: {e}")))?;
    let selection = parse_selection(&raw, matrix)?;
    info!(decision = ?selection.decision, pair = ?selection.pair_label(), "archetype selected");

    let explanation = match (&selection.decision, &selection.first_word, &selection.second_word) {
        (Decision::Approved, Some(first), Some(second)) => {
            explain_or(
                ctx,
                ExplainSubject::Archetype {
                    first_word: first.clone(),
                    second_word: second.clone(),
                },
                &selection.reasoning,
            )
            .await
        }
        _ => selection.reasoning.clone(),
    };

    Ok((Outcome::Archetype(selection), explanation))
}

/// Calls `explain` when the quiz configures it, falling back to `fallback`
/// on any failure. Never affects which result won.
async fn explain_or(ctx: &ScoringContext<'_>, subject: ExplainSubject, fallback: &str) -> String {
    let (Some(prompt_config), Some(reasoner)) = (ctx.quiz.explain_prompt.as_ref(), ctx.reasoner)
    else {
        return fallback.to_owned();
    };

    let request = ExplainRequest {
        session_id: ctx.session_id.map(str::to_owned),
        subject,
        responses: ctx.responses.to_vec(),
        prompt_config: prompt_config.clone(),
    };
    match call_with_timeout(ctx.timeout, reasoner.explain(request)).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => fallback.to_owned(),
        Err(e) => {
            warn!(quiz_id = %ctx.quiz.id, error = %e, "explanation failed, using static text");
            fallback.to_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use quizflow_core::gateway::GatewayError;
    use quizflow_test_support::{ScriptedCollaborators, mediated_quiz, rule_table_quiz};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    fn answer(quiz: &QuizDefinition, question_index: usize, value: &str) -> Response {
        let question = &quiz.questions[question_index];
        let option = question.option_by_value(value).unwrap();
        Response {
            question_index,
            question_id: question.id.clone(),
            question_text: question.text.clone(),
            selected_label: option.label.clone(),
            value: value.to_owned(),
            is_custom: false,
            answered_at: now(),
        }
    }

    fn ctx<'a>(
        quiz: &'a QuizDefinition,
        responses: &'a [Response],
        reasoner: Option<&'a dyn ResultReasoner>,
    ) -> ScoringContext<'a> {
        ScoringContext {
            quiz,
            responses,
            session_id: Some("remote-1"),
            reasoner,
            timeout: Duration::from_millis(50),
            now: now(),
        }
    }

    #[tokio::test]
    async fn test_rule_table_result_uses_static_description_without_explain_config() {
        // Arrange
        let quiz = rule_table_quiz();
        let responses = vec![answer(&quiz, 0, "x"), answer(&quiz, 1, "x")];
        let reasoner = ScriptedCollaborators::new();

        // Act
        let record = compute_result(ctx(&quiz, &responses, Some(&reasoner)))
            .await
            .unwrap();

        // Assert
        match &record.outcome {
            Outcome::Category {
                category_id,
                scores,
                ..
            } => {
                assert_eq!(category_id, "A");
                assert_eq!(scores[0].score, 4);
                assert_eq!(scores[1].score, 2);
            }
            other => panic!("expected Category, got {other:?}"),
        }
        assert_eq!(record.explanation, "Static alpha description.");
        assert_eq!(record.responses, responses);
        assert!(reasoner.explains().is_empty());
    }

    #[tokio::test]
    async fn test_explain_enriches_but_never_changes_the_winner() {
        let mut quiz = rule_table_quiz();
        quiz.explain_prompt = Some(serde_json::json!({ "style": "short" }));
        let responses = vec![answer(&quiz, 0, "y"), answer(&quiz, 1, "y")];
        let reasoner = ScriptedCollaborators::new().with_explain(Ok("You are a Beta.".to_owned()));

        let record = compute_result(ctx(&quiz, &responses, Some(&reasoner)))
            .await
            .unwrap();

        assert!(matches!(&record.outcome, Outcome::Category { category_id, .. } if category_id == "B"));
        assert_eq!(record.explanation, "You are a Beta.");
        let explains = reasoner.explains();
        assert_eq!(explains.len(), 1);
        assert_eq!(
            explains[0].subject,
            ExplainSubject::Category {
                category_id: "B".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn test_explain_failure_falls_back_to_static_description() {
        let mut quiz = rule_table_quiz();
        quiz.explain_prompt = Some(serde_json::json!({}));
        let responses = vec![answer(&quiz, 0, "x")];
        let reasoner = ScriptedCollaborators::new()
            .with_explain(Err(GatewayError::Transport("refused".to_owned())));

        let record = compute_result(ctx(&quiz, &responses, Some(&reasoner)))
            .await
            .unwrap();

        assert_eq!(record.explanation, "Static alpha description.");
    }

    #[tokio::test]
    async fn test_mediated_selection_sends_base_transcript_and_word_matrix() {
        // Arrange
        let mut quiz = mediated_quiz(true);
        quiz.explain_prompt = Some(serde_json::json!({ "tone": "warm" }));
        let responses = vec![answer(&quiz, 0, "wave"), answer(&quiz, 1, "maps")];
        let reasoner = ScriptedCollaborators::new()
            .with_select(Ok(r#"{"decision":"APPROVED","firstWord":"Bold","secondWord":"Explorer","tagline":"Onward.","reasoning":"Maps."}"#.to_owned()))
            .with_explain(Ok("A long explanation.".to_owned()));

        // Act
        let record = compute_result(ctx(&quiz, &responses, Some(&reasoner)))
            .await
            .unwrap();

        // Assert
        let selects = reasoner.selects();
        assert_eq!(selects.len(), 1);
        assert_eq!(selects[0].responses[0].question, "How do you greet a stranger?");
        assert_eq!(selects[0].responses[0].answer, "Wave back");
        assert_eq!(selects[0].word_matrix.first_words, vec!["Bold", "Gentle"]);
        assert_eq!(selects[0].session_id.as_deref(), Some("remote-1"));
        match &record.outcome {
            Outcome::Archetype(selection) => {
                assert_eq!(selection.pair_label().as_deref(), Some("Bold Explorer"));
                assert_eq!(selection.tagline.as_deref(), Some("Onward."));
            }
            other => panic!("expected Archetype, got {other:?}"),
        }
        assert_eq!(record.explanation, "A long explanation.");
    }

    #[tokio::test]
    async fn test_mediated_timeout_is_an_analysis_error() {
        let quiz = mediated_quiz(false);
        let responses = vec![answer(&quiz, 0, "nod")];
        let reasoner = ScriptedCollaborators::new().with_hanging_select();

        let result = compute_result(ctx(&quiz, &responses, Some(&reasoner))).await;

        match result {
            Err(DomainError::Analysis(msg)) => assert!(msg.contains("timed out"), "{msg}"),
            other => panic!("expected Analysis error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mediated_without_reasoner_is_an_analysis_error() {
        let quiz = mediated_quiz(false);

        let result = compute_result(ctx(&quiz, &[], None)).await;

        assert!(matches!(result, Err(DomainError::Analysis(_))));
    }

    #[tokio::test]
    async fn test_mediated_rejection_skips_explain_and_uses_reasoning() {
        let mut quiz = mediated_quiz(true);
        quiz.explain_prompt = Some(serde_json::json!({}));
        let reasoner = ScriptedCollaborators::new()
            .with_select(Ok(r#"{"decision":"REJECTED","reasoning":"Not yet."}"#.to_owned()));

        let record = compute_result(ctx(&quiz, &[], Some(&reasoner))).await.unwrap();

        assert_eq!(record.explanation, "Not yet.");
        assert!(reasoner.explains().is_empty());
    }
}
