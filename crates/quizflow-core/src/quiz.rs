//! Quiz definition model.
//!
//! A quiz is a directed graph: questions are nodes, options are edges with
//! an optional explicit target. Definitions are authored as YAML and
//! validated once at load time by the catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Free-form personalization data collected before the first question.
pub type Personalization = BTreeMap<String, String>;

/// A complete, validated quiz definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizDefinition {
    /// Unique quiz identifier; also the session cache key.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Short description shown on the welcome screen.
    #[serde(default)]
    pub description: String,
    /// Optional personalization step shown before the first question.
    #[serde(default)]
    pub personalization: Option<PersonalizationStep>,
    /// Story framing sent to the narrative adapter. Narrative adaptation is
    /// enabled only when this is present.
    #[serde(default)]
    pub story_setup: Option<String>,
    /// Whether free-text answers are routed through the branch classifier.
    #[serde(default)]
    pub branch_classification: bool,
    /// Opaque prompt configuration forwarded to the `explain` call. The
    /// explanation step is skipped when absent.
    #[serde(default)]
    pub explain_prompt: Option<serde_json::Value>,
    /// Questions in declaration order.
    pub questions: Vec<Question>,
    /// Scoring strategy, fixed for every run of this quiz.
    pub scoring: QuizKind,
    /// SHA-256 fingerprint of the source document, filled in by the catalog.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub definition_hash: String,
}

impl QuizDefinition {
    /// Returns the index of the question with the given identifier.
    #[must_use]
    pub fn question_index(&self, question_id: &str) -> Option<usize> {
        self.questions.iter().position(|q| q.id == question_id)
    }

    /// Returns the question at `index`.
    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Total number of declared questions, reported as `totalSteps`.
    #[must_use]
    pub fn total_steps(&self) -> usize {
        self.questions.len()
    }

    /// Whether question display text is sent through the narrative adapter.
    #[must_use]
    pub fn adapts_narrative(&self) -> bool {
        self.story_setup.is_some()
    }

    /// Whether a personalization screen precedes the first question.
    #[must_use]
    pub fn requires_personalization(&self) -> bool {
        self.personalization.is_some()
    }
}

/// Fields collected on the personalization screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalizationStep {
    /// Fields in display order.
    pub fields: Vec<PersonalizationField>,
}

/// A single personalization input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalizationField {
    /// Key under which the value is stored.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Whether a non-blank value is required to continue.
    #[serde(default = "default_true")]
    pub required: bool,
}

fn default_true() -> bool {
    true
}

/// A question node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Identifier, unique within the quiz.
    pub id: String,
    /// Base prompt text. This is what analysis sees, never adapted text.
    pub text: String,
    /// Base narrative shown when no adaptation is available.
    #[serde(default)]
    pub scenario: Option<String>,
    /// Options in display order.
    #[serde(default)]
    pub options: Vec<QuizOption>,
    /// Whether the participant may type a custom answer.
    #[serde(default)]
    pub allow_free_text: bool,
}

impl Question {
    /// Display text used when the narrative adapter is disabled or fails.
    #[must_use]
    pub fn base_narrative(&self) -> &str {
        self.scenario.as_deref().unwrap_or(&self.text)
    }

    /// Looks up an option by its value token.
    #[must_use]
    pub fn option_by_value(&self, value: &str) -> Option<&QuizOption> {
        self.options.iter().find(|o| o.value == value)
    }
}

/// An option edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOption {
    /// Display label.
    pub label: String,
    /// Value token used by scoring.
    pub value: String,
    /// Explicit branch target.
    #[serde(default)]
    pub next_question_id: Option<String>,
}

/// Scoring strategy. Selected once at load and never mixed within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuizKind {
    /// Deterministic point accumulation.
    RuleTable(RuleTable),
    /// Category selection delegated to the external reasoning service.
    Mediated(WordMatrix),
}

/// Rule-table scoring configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTable {
    /// Categories in declaration order; earlier wins ties.
    pub categories: Vec<CategoryDefinition>,
    /// Point rules keyed by `(question_index, value)`.
    #[serde(default)]
    pub rules: Vec<ScoringRule>,
}

impl RuleTable {
    /// Returns the point deltas for a `(question_index, value)` pair.
    #[must_use]
    pub fn points_for(&self, question_index: usize, value: &str) -> Option<&BTreeMap<String, i64>> {
        self.rules
            .iter()
            .find(|r| r.question_index == question_index && r.value == value)
            .map(|r| &r.points)
    }
}

/// A rule-table category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    /// Category identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Static description, also the explanation fallback.
    #[serde(default)]
    pub description: String,
}

/// One row of the rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringRule {
    /// Declaration index of the question.
    pub question_index: usize,
    /// Selected value token.
    pub value: String,
    /// Point deltas per category identifier.
    pub points: BTreeMap<String, i64>,
}

/// Closed vocabulary for mediated selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordMatrix {
    /// First-word axis.
    pub first_words: Vec<String>,
    /// Second-word axis.
    pub second_words: Vec<String>,
    /// Per-combination guidance for the reasoning service.
    #[serde(default)]
    pub guidance: Vec<CombinationGuidance>,
    /// Gating quizzes may return `REJECTED`; descriptive ones are always
    /// approved.
    #[serde(default)]
    pub gated: bool,
}

impl WordMatrix {
    /// Returns the first-axis term matching `word` case-insensitively, in
    /// vocabulary casing.
    #[must_use]
    pub fn first_term(&self, word: &str) -> Option<&str> {
        find_term(&self.first_words, word)
    }

    /// Returns the second-axis term matching `word` case-insensitively, in
    /// vocabulary casing.
    #[must_use]
    pub fn second_term(&self, word: &str) -> Option<&str> {
        find_term(&self.second_words, word)
    }
}

fn find_term<'a>(terms: &'a [String], word: &str) -> Option<&'a str> {
    let word = word.trim();
    terms
        .iter()
        .find(|t| t.eq_ignore_ascii_case(word))
        .map(String::as_str)
}

/// Guidance for one first/second word combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationGuidance {
    /// First-axis term.
    pub first_word: String,
    /// Second-axis term.
    pub second_word: String,
    /// Free-form guidance text.
    pub guidance: String,
}
