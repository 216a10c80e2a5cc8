//! Load-time validation of quiz definitions.

use std::collections::HashSet;

use quizflow_core::error::DomainError;
use quizflow_core::quiz::{QuizDefinition, QuizKind, RuleTable, WordMatrix};

/// Validates a quiz definition.
///
/// Every problem found is reported, not just the first.
///
/// # Errors
///
/// Returns `DomainError::Configuration` listing every issue when the
/// definition is unusable.
pub fn validate_quiz(quiz: &QuizDefinition) -> Result<(), DomainError> {
    let mut issues = Vec::new();

    if quiz.id.trim().is_empty() {
        issues.push("quiz id must not be blank".to_owned());
    }
    if quiz.questions.is_empty() {
        issues.push("quiz must declare at least one question".to_owned());
    }

    check_questions(quiz, &mut issues);
    check_personalization(quiz, &mut issues);

    match &quiz.scoring {
        QuizKind::RuleTable(table) => check_rule_table(quiz, table, &mut issues),
        QuizKind::Mediated(matrix) => check_word_matrix(matrix, &mut issues),
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(DomainError::Configuration(format!(
            "quiz '{}': {}",
            quiz.id,
            issues.join("; ")
        )))
    }
}

fn check_questions(quiz: &QuizDefinition, issues: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for question in &quiz.questions {
        if question.id.trim().is_empty() {
            issues.push("question id must not be blank".to_owned());
        } else if !seen.insert(question.id.as_str()) {
            issues.push(format!("duplicate question id '{}'", question.id));
        }
        if question.options.is_empty() && !question.allow_free_text {
            issues.push(format!(
                "question '{}' has no options and does not allow free text",
                question.id
            ));
        }

        let mut values = HashSet::new();
        for option in &question.options {
            if !values.insert(option.value.as_str()) {
                issues.push(format!(
                    "question '{}' repeats option value '{}'",
                    question.id, option.value
                ));
            }
        }
    }

    // Branch edges are checked after every id is known.
    for question in &quiz.questions {
        for option in &question.options {
            let Some(target) = option.next_question_id.as_deref() else {
                continue;
            };
            if target == question.id {
                issues.push(format!(
                    "option '{}' on question '{}' branches to its own question",
                    option.value, question.id
                ));
                continue;
            }
            if quiz.question_index(target).is_none() {
                issues.push(format!(
                    "option '{}' on question '{}' branches to unknown question '{target}'",
                    option.value, question.id
                ));
            }
        }
    }
}

fn check_personalization(quiz: &QuizDefinition, issues: &mut Vec<String>) {
    let Some(step) = &quiz.personalization else {
        return;
    };
    if step.fields.is_empty() {
        issues.push("personalization step declares no fields".to_owned());
    }
    let mut keys = HashSet::new();
    for field in &step.fields {
        if field.key.trim().is_empty() {
            issues.push("personalization field key must not be blank".to_owned());
        } else if !keys.insert(field.key.as_str()) {
            issues.push(format!("duplicate personalization field '{}'", field.key));
        }
    }
}

fn check_rule_table(quiz: &QuizDefinition, table: &RuleTable, issues: &mut Vec<String>) {
    if table.categories.is_empty() {
        issues.push("rule table declares no categories".to_owned());
    }
    let mut categories = HashSet::new();
    for category in &table.categories {
        if !categories.insert(category.id.as_str()) {
            issues.push(format!("duplicate category id '{}'", category.id));
        }
    }

    for rule in &table.rules {
        let Some(question) = quiz.question(rule.question_index) else {
            issues.push(format!(
                "rule references question index {} but only {} questions exist",
                rule.question_index,
                quiz.questions.len()
            ));
            continue;
        };
        if question.option_by_value(&rule.value).is_none() && !question.allow_free_text {
            issues.push(format!(
                "rule references unknown value '{}' on question '{}'",
                rule.value, question.id
            ));
        }
        for category_id in rule.points.keys() {
            if !categories.contains(category_id.as_str()) {
                issues.push(format!(
                    "rule for question '{}' awards points to unknown category '{category_id}'",
                    question.id
                ));
            }
        }
    }
}

fn check_word_matrix(matrix: &WordMatrix, issues: &mut Vec<String>) {
    if matrix.first_words.is_empty() {
        issues.push("word matrix first-word axis is empty".to_owned());
    }
    if matrix.second_words.is_empty() {
        issues.push("word matrix second-word axis is empty".to_owned());
    }
    for entry in &matrix.guidance {
        if matrix.first_term(&entry.first_word).is_none()
            || matrix.second_term(&entry.second_word).is_none()
        {
            issues.push(format!(
                "guidance for '{} {}' is outside the word matrix",
                entry.first_word, entry.second_word
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizflow_core::quiz::QuizOption;
    use quizflow_test_support::{linear_quiz, mediated_quiz, rule_table_quiz};

    fn message(result: Result<(), DomainError>) -> String {
        match result {
            Err(DomainError::Configuration(msg)) => msg,
            other => panic!("expected Configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_fixture_quizzes_are_valid() {
        assert!(validate_quiz(&linear_quiz()).is_ok());
        assert!(validate_quiz(&rule_table_quiz()).is_ok());
        assert!(validate_quiz(&mediated_quiz(true)).is_ok());
    }

    #[test]
    fn test_self_referential_branch_is_rejected() {
        // Arrange
        let mut quiz = linear_quiz();
        quiz.questions[0].options[0].next_question_id = Some("q1".to_owned());

        // Act
        let msg = message(validate_quiz(&quiz));

        // Assert
        assert!(msg.contains("branches to its own question"), "{msg}");
    }

    #[test]
    fn test_dangling_branch_is_rejected() {
        let mut quiz = linear_quiz();
        quiz.questions[1].options.push(QuizOption {
            label: "D".to_owned(),
            value: "d".to_owned(),
            next_question_id: Some("q9".to_owned()),
        });

        let msg = message(validate_quiz(&quiz));

        assert!(msg.contains("unknown question 'q9'"), "{msg}");
    }

    #[test]
    fn test_backward_branch_is_accepted() {
        let mut quiz = linear_quiz();
        quiz.questions[2].options[0].next_question_id = Some("q2".to_owned());

        assert!(validate_quiz(&quiz).is_ok());
    }

    #[test]
    fn test_duplicate_question_ids_and_unknown_categories_are_all_reported() {
        // Arrange
        let mut quiz = rule_table_quiz();
        quiz.questions[1].id = "first".to_owned();
        if let QuizKind::RuleTable(table) = &mut quiz.scoring {
            table.rules[0].points.insert("Z".to_owned(), 1);
        }

        // Act
        let msg = message(validate_quiz(&quiz));

        // Assert
        assert!(msg.contains("duplicate question id 'first'"), "{msg}");
        assert!(msg.contains("unknown category 'Z'"), "{msg}");
    }

    #[test]
    fn test_empty_word_axis_is_rejected() {
        let mut quiz = mediated_quiz(false);
        if let QuizKind::Mediated(matrix) = &mut quiz.scoring {
            matrix.second_words.clear();
        }

        let msg = message(validate_quiz(&quiz));

        assert!(msg.contains("second-word axis is empty"), "{msg}");
    }
}
