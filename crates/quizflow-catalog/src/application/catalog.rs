//! Quiz catalog: parses, fingerprints, validates, and serves definitions.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use quizflow_core::error::DomainError;
use quizflow_core::quiz::{QuizDefinition, QuizKind};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::domain::validation::validate_quiz;

/// Summary of a loaded quiz for listings.
#[derive(Debug, Clone, Serialize)]
pub struct QuizSummary {
    /// Quiz identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Short description.
    pub description: String,
    /// Number of declared questions.
    pub total_steps: usize,
    /// `"rule_table"` or `"mediated"`.
    pub scoring: &'static str,
}

/// Parses a YAML quiz document, fingerprints its source, and validates it.
///
/// # Errors
///
/// Returns `DomainError::Configuration` if the YAML is malformed or the
/// definition fails validation.
pub fn parse_quiz(source: &str) -> Result<QuizDefinition, DomainError> {
    let mut quiz: QuizDefinition = serde_yaml::from_str(source)
        .map_err(|e| DomainError::Configuration(format!("invalid quiz document: {e}")))?;
    quiz.definition_hash = format!("{:x}", Sha256::digest(source.as_bytes()));
    validate_quiz(&quiz)?;
    Ok(quiz)
}

fn summarize(quiz: &QuizDefinition) -> QuizSummary {
    QuizSummary {
        id: quiz.id.clone(),
        title: quiz.title.clone(),
        description: quiz.description.clone(),
        total_steps: quiz.total_steps(),
        scoring: match quiz.scoring {
            QuizKind::RuleTable(_) => "rule_table",
            QuizKind::Mediated(_) => "mediated",
        },
    }
}

/// Every loaded quiz, keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct QuizCatalog {
    quizzes: BTreeMap<String, Arc<QuizDefinition>>,
}

impl QuizCatalog {
    /// Builds a catalog from already-parsed definitions, validating each.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if any definition is invalid or
    /// two definitions share an identifier.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = QuizDefinition>,
    ) -> Result<Self, DomainError> {
        let mut quizzes = BTreeMap::new();
        for quiz in definitions {
            validate_quiz(&quiz)?;
            let id = quiz.id.clone();
            if quizzes.insert(id.clone(), Arc::new(quiz)).is_some() {
                return Err(DomainError::Configuration(format!(
                    "quiz id '{id}' is declared more than once"
                )));
            }
        }
        Ok(Self { quizzes })
    }

    /// Loads every `*.yaml`/`*.yml` file in `dir`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the directory cannot be read
    /// and `DomainError::Configuration` if any document is invalid.
    pub fn load_dir(dir: &Path) -> Result<Self, DomainError> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            DomainError::Infrastructure(format!("cannot read quiz dir {}: {e}", dir.display()))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| DomainError::Infrastructure(format!("cannot list quiz dir: {e}")))?
                .path();
            let is_yaml = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == "yaml" || ext == "yml");
            if is_yaml {
                paths.push(path);
            }
        }
        paths.sort();

        let mut definitions = Vec::with_capacity(paths.len());
        for path in &paths {
            let source = std::fs::read_to_string(path).map_err(|e| {
                DomainError::Infrastructure(format!("cannot read {}: {e}", path.display()))
            })?;
            let quiz = parse_quiz(&source).map_err(|e| match e {
                DomainError::Configuration(msg) => {
                    DomainError::Configuration(format!("{}: {msg}", path.display()))
                }
                other => other,
            })?;
            info!(quiz_id = %quiz.id, path = %path.display(), "loaded quiz definition");
            definitions.push(quiz);
        }

        Self::from_definitions(definitions)
    }

    /// Returns the quiz with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::QuizNotFound` if no such quiz is loaded.
    pub fn get(&self, quiz_id: &str) -> Result<Arc<QuizDefinition>, DomainError> {
        self.quizzes
            .get(quiz_id)
            .cloned()
            .ok_or_else(|| DomainError::QuizNotFound(quiz_id.to_owned()))
    }

    /// Summary of the quiz with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::QuizNotFound` if no such quiz is loaded.
    pub fn summary(&self, quiz_id: &str) -> Result<QuizSummary, DomainError> {
        self.get(quiz_id).map(|quiz| summarize(&quiz))
    }

    /// Summaries of every loaded quiz, ordered by identifier.
    #[must_use]
    pub fn summaries(&self) -> Vec<QuizSummary> {
        self.quizzes.values().map(|quiz| summarize(quiz)).collect()
    }

    /// Number of loaded quizzes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.quizzes.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quizzes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizflow_test_support::{linear_quiz, rule_table_quiz};

    const SOURCE: &str = r"
id: compass
title: Inner Compass
story_setup: A fork in a mountain road.
questions:
  - id: start
    text: Which way?
    scenario: Fog rolls over the fork.
    options:
      - { label: North, value: north }
      - { label: Cliffs, value: cliffs, next_question_id: summit }
  - id: river
    text: Cross the river?
    options:
      - { label: Wade, value: wade }
  - id: summit
    text: What do you see?
    allow_free_text: true
scoring:
  kind: rule_table
  categories:
    - { id: climber, name: Climber, description: Up is the only way. }
    - { id: wanderer, name: Wanderer }
  rules:
    - { question_index: 0, value: north, points: { wanderer: 2 } }
    - { question_index: 0, value: cliffs, points: { climber: 3 } }
";

    #[test]
    fn test_parse_quiz_reads_yaml_and_fingerprints_source() {
        // Act
        let quiz = parse_quiz(SOURCE).unwrap();

        // Assert
        assert_eq!(quiz.id, "compass");
        assert_eq!(quiz.total_steps(), 3);
        assert!(quiz.adapts_narrative());
        assert_eq!(
            quiz.questions[0].options[1].next_question_id.as_deref(),
            Some("summit")
        );
        assert!(quiz.questions[2].allow_free_text);
        assert_eq!(quiz.definition_hash.len(), 64);
        assert_eq!(quiz.definition_hash, parse_quiz(SOURCE).unwrap().definition_hash);
    }

    #[test]
    fn test_parse_quiz_rejects_dangling_branch_target() {
        let source = SOURCE.replace("next_question_id: summit", "next_question_id: nowhere");

        let result = parse_quiz(&source);

        match result {
            Err(DomainError::Configuration(msg)) => assert!(msg.contains("nowhere"), "{msg}"),
            other => panic!("expected Configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_quiz_rejects_malformed_yaml() {
        let result = parse_quiz("id: [unclosed");

        assert!(matches!(result, Err(DomainError::Configuration(_))));
    }

    #[test]
    fn test_catalog_serves_definitions_and_reports_missing_quiz() {
        // Arrange
        let catalog = QuizCatalog::from_definitions([linear_quiz(), rule_table_quiz()]).unwrap();

        // Act
        let trail = catalog.get("trail").unwrap();
        let missing = catalog.get("absent");

        // Assert
        assert_eq!(trail.title, "Trail Finder");
        assert_eq!(catalog.len(), 2);
        match missing {
            Err(DomainError::QuizNotFound(id)) => assert_eq!(id, "absent"),
            other => panic!("expected QuizNotFound, got {other:?}"),
        }
        let ids: Vec<_> = catalog.summaries().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["letters".to_owned(), "trail".to_owned()]);
    }

    #[test]
    fn test_catalog_rejects_duplicate_quiz_ids() {
        let result = QuizCatalog::from_definitions([linear_quiz(), linear_quiz()]);

        assert!(matches!(result, Err(DomainError::Configuration(_))));
    }

    #[test]
    fn test_load_dir_accepts_bundled_quizzes() {
        // Arrange
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../quizzes");

        // Act
        let catalog = QuizCatalog::load_dir(&dir).unwrap();

        // Assert
        let summaries = catalog.summaries();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, "lantern-market");
        assert_eq!(summaries[0].scoring, "mediated");
        assert_eq!(summaries[1].id, "trail-finder");
        assert_eq!(summaries[1].total_steps, 4);
        assert!(!catalog.get("trail-finder").unwrap().definition_hash.is_empty());
    }
}
