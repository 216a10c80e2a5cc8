//! Branch resolver.

use std::time::Duration;

use quizflow_core::gateway::{BranchClassifier, ClassifyBranchRequest, call_with_timeout};
use quizflow_core::quiz::{QuizDefinition, QuizOption};
use tracing::{debug, warn};

/// What the participant picked on the current question.
#[derive(Debug, Clone, Copy)]
pub enum Selection<'a> {
    /// A declared option.
    Option(&'a QuizOption),
    /// A typed answer.
    FreeText(&'a str),
}

/// How the next question was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchVia {
    /// The option's `next_question_id`.
    Explicit,
    /// The external free-text classifier.
    Classified,
    /// Default linear advance, skipping visited questions.
    Linear,
}

/// Outcome of branch resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchDecision {
    /// Show the question at `index` next.
    Next {
        /// Declaration index of the next question.
        index: usize,
        /// How it was chosen.
        via: BranchVia,
    },
    /// No unvisited question remains.
    Complete,
}

/// Resolves the question that follows `current_index`.
///
/// `path` holds every visited question identifier, including the current
/// one. A dangling or already visited `next_question_id` falls through to
/// linear advance. The
/// classifier is consulted only for free text on quizzes with branch
/// classification enabled; its failures and timeouts also fall through to
/// linear advance.
pub async fn resolve_next(
    quiz: &QuizDefinition,
    current_index: usize,
    selection: Selection<'_>,
    path: &[String],
    classifier: Option<&dyn BranchClassifier>,
    timeout: Duration,
) -> BranchDecision {
    match selection {
        Selection::Option(option) => {
            if let Some(index) = explicit_target(quiz, option) {
                if visited(quiz, index, path) {
                    debug!(quiz_id = %quiz.id, target = index, "explicit branch already visited, using linear advance");
                } else {
                    debug!(quiz_id = %quiz.id, target = index, "explicit branch");
                    return BranchDecision::Next {
                        index,
                        via: BranchVia::Explicit,
                    };
                }
            }
        }
        Selection::FreeText(text) => {
            if quiz.branch_classification {
                if let Some(classifier) = classifier {
                    if let Some(index) =
                        classify(quiz, current_index, text, path, classifier, timeout).await
                    {
                        return BranchDecision::Next {
                            index,
                            via: BranchVia::Classified,
                        };
                    }
                }
            }
        }
    }

    match next_unvisited(quiz, current_index, path) {
        Some(index) => BranchDecision::Next {
            index,
            via: BranchVia::Linear,
        },
        None => BranchDecision::Complete,
    }
}

/// Resolves an option's explicit target, ignoring targets that do not
/// exist.
#[must_use]
pub fn explicit_target(quiz: &QuizDefinition, option: &QuizOption) -> Option<usize> {
    let target = option.next_question_id.as_deref()?;
    let index = quiz.question_index(target);
    if index.is_none() {
        warn!(quiz_id = %quiz.id, target, "ignoring unresolvable branch target");
    }
    index
}

fn visited(quiz: &QuizDefinition, index: usize, path: &[String]) -> bool {
    quiz.question(index)
        .is_some_and(|q| path.iter().any(|visited| *visited == q.id))
}

/// First question after `current_index` whose identifier is not in `path`.
#[must_use]
pub fn next_unvisited(quiz: &QuizDefinition, current_index: usize, path: &[String]) -> Option<usize> {
    quiz.questions
        .iter()
        .enumerate()
        .skip(current_index + 1)
        .find(|(_, q)| !path.iter().any(|visited| *visited == q.id))
        .map(|(index, _)| index)
}

async fn classify(
    quiz: &QuizDefinition,
    current_index: usize,
    text: &str,
    path: &[String],
    classifier: &dyn BranchClassifier,
    timeout: Duration,
) -> Option<usize> {
    let question_id = quiz.question(current_index)?.id.clone();
    let request = ClassifyBranchRequest {
        quiz_id: quiz.id.clone(),
        question_id: question_id.clone(),
        custom_input: text.to_owned(),
        current_path: path.to_vec(),
    };

    let target = match call_with_timeout(timeout, classifier.classify(request)).await {
        Ok(Some(target)) => target,
        Ok(None) => return None,
        Err(e) => {
            warn!(quiz_id = %quiz.id, %question_id, error = %e, "branch classification failed, using linear advance");
            return None;
        }
    };

    let usable = target != question_id && !path.iter().any(|visited| *visited == target);
    match quiz.question_index(&target) {
        Some(index) if usable => {
            debug!(quiz_id = %quiz.id, %target, "classified branch");
            Some(index)
        }
        _ => {
            warn!(quiz_id = %quiz.id, %target, "ignoring unusable classifier target");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizflow_core::gateway::GatewayError;
    use quizflow_test_support::{ScriptedCollaborators, linear_quiz, mediated_quiz};

    const LIMIT: Duration = Duration::from_secs(1);

    fn path(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| (*s).to_owned()).collect()
    }

    #[tokio::test]
    async fn test_explicit_target_wins_over_linear_order() {
        // Arrange
        let quiz = linear_quiz();
        let option_c = &quiz.questions[1].options[2];

        // Act
        let decision = resolve_next(
            &quiz,
            1,
            Selection::Option(option_c),
            &path(&["q1", "q2", "q3"]),
            None,
            LIMIT,
        )
        .await;

        // Assert
        assert_eq!(
            decision,
            BranchDecision::Next {
                index: 3,
                via: BranchVia::Explicit
            }
        );
    }

    #[tokio::test]
    async fn test_linear_advance_skips_visited_questions() {
        let quiz = linear_quiz();
        let option_a = &quiz.questions[0].options[0];

        let decision = resolve_next(
            &quiz,
            0,
            Selection::Option(option_a),
            &path(&["q1", "q2", "q3"]),
            None,
            LIMIT,
        )
        .await;

        assert_eq!(
            decision,
            BranchDecision::Next {
                index: 3,
                via: BranchVia::Linear
            }
        );
    }

    #[tokio::test]
    async fn test_linear_advance_never_returns_a_visited_question() {
        let quiz = linear_quiz();
        let option_a = &quiz.questions[0].options[0];
        let visited = path(&["q1", "q2", "q3", "q4"]);

        for current in 0..quiz.questions.len() {
            let decision =
                resolve_next(&quiz, current, Selection::Option(option_a), &visited, None, LIMIT)
                    .await;
            assert_eq!(decision, BranchDecision::Complete);
        }
    }

    #[tokio::test]
    async fn test_dangling_target_falls_through_to_linear_advance() {
        let quiz = linear_quiz();
        let dangling = QuizOption {
            label: "Z".to_owned(),
            value: "z".to_owned(),
            next_question_id: Some("missing".to_owned()),
        };

        let decision = resolve_next(
            &quiz,
            0,
            Selection::Option(&dangling),
            &path(&["q1"]),
            None,
            LIMIT,
        )
        .await;

        assert_eq!(
            decision,
            BranchDecision::Next {
                index: 1,
                via: BranchVia::Linear
            }
        );
    }

    #[tokio::test]
    async fn test_last_question_completes() {
        let quiz = linear_quiz();
        let option_a = &quiz.questions[3].options[0];

        let decision = resolve_next(
            &quiz,
            3,
            Selection::Option(option_a),
            &path(&["q1", "q2", "q4"]),
            None,
            LIMIT,
        )
        .await;

        assert_eq!(decision, BranchDecision::Complete);
    }

    #[tokio::test]
    async fn test_free_text_uses_classifier_target() {
        // Arrange
        let mut quiz = linear_quiz();
        quiz.branch_classification = true;
        let classifier = ScriptedCollaborators::new().with_classify(Ok(Some("q3".to_owned())));

        // Act
        let decision = resolve_next(
            &quiz,
            0,
            Selection::FreeText("somewhere quiet"),
            &path(&["q1"]),
            Some(&classifier),
            LIMIT,
        )
        .await;

        // Assert
        assert_eq!(
            decision,
            BranchDecision::Next {
                index: 2,
                via: BranchVia::Classified
            }
        );
        let requests = classifier.classifies();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].custom_input, "somewhere quiet");
        assert_eq!(requests[0].current_path, path(&["q1"]));
    }

    #[tokio::test]
    async fn test_classifier_failure_falls_back_to_linear_advance() {
        let mut quiz = linear_quiz();
        quiz.branch_classification = true;
        let classifier = ScriptedCollaborators::new()
            .with_classify(Err(GatewayError::Transport("down".to_owned())));

        let decision = resolve_next(
            &quiz,
            0,
            Selection::FreeText("anything"),
            &path(&["q1"]),
            Some(&classifier),
            LIMIT,
        )
        .await;

        assert_eq!(
            decision,
            BranchDecision::Next {
                index: 1,
                via: BranchVia::Linear
            }
        );
    }

    #[tokio::test]
    async fn test_classifier_target_already_visited_is_ignored() {
        let mut quiz = linear_quiz();
        quiz.branch_classification = true;
        let classifier = ScriptedCollaborators::new().with_classify(Ok(Some("q1".to_owned())));

        let decision = resolve_next(
            &quiz,
            1,
            Selection::FreeText("back again"),
            &path(&["q1", "q2"]),
            Some(&classifier),
            LIMIT,
        )
        .await;

        assert_eq!(
            decision,
            BranchDecision::Next {
                index: 2,
                via: BranchVia::Linear
            }
        );
    }

    #[tokio::test]
    async fn test_classifier_not_consulted_when_quiz_disables_classification() {
        let quiz = mediated_quiz(false);
        let classifier = ScriptedCollaborators::new().with_classify(Ok(Some("m2".to_owned())));

        let decision = resolve_next(
            &quiz,
            0,
            Selection::FreeText("hello"),
            &path(&["m1"]),
            Some(&classifier),
            LIMIT,
        )
        .await;

        assert_eq!(
            decision,
            BranchDecision::Next {
                index: 1,
                via: BranchVia::Linear
            }
        );
        assert!(classifier.classifies().is_empty());
    }

    #[tokio::test]
    async fn test_visited_explicit_target_falls_through_to_linear_advance() {
        // Arrange
        let quiz = linear_quiz();
        let option_c = &quiz.questions[1].options[2];

        // Act
        let decision = resolve_next(
            &quiz,
            1,
            Selection::Option(option_c),
            &path(&["q1", "q4", "q2"]),
            None,
            LIMIT,
        )
        .await;

        // Assert
        assert_eq!(
            decision,
            BranchDecision::Next {
                index: 2,
                via: BranchVia::Linear
            }
        );
    }
}
