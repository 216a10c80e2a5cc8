//! Participant answers, responses, and computed results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An answer as submitted by the participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Answer {
    /// One of the question's declared options, identified by value token.
    Choice {
        /// The option's value token.
        value: String,
    },
    /// A custom typed answer on a question that allows free text.
    FreeText {
        /// The typed text.
        text: String,
    },
}

/// A recorded answer to one visited question. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Declaration index of the question.
    pub question_index: usize,
    /// Question identifier.
    pub question_id: String,
    /// Base (non-adapted) question text.
    pub question_text: String,
    /// Label of the selected option, or the typed text.
    pub selected_label: String,
    /// Value token of the selected option, or the typed text.
    pub value: String,
    /// Whether `value` came from free text.
    pub is_custom: bool,
    /// Submission time.
    pub answered_at: DateTime<Utc>,
}

/// Accumulated points for one rule-table category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScore {
    /// Category identifier.
    pub category_id: String,
    /// Summed points.
    pub score: i64,
}

/// Gating decision returned by mediated selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// The participant qualifies; a word pair was chosen.
    Approved,
    /// The participant does not qualify (gated quizzes only).
    Rejected,
}

/// A ranked alternative word pair that was considered but not chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchetypeAlternative {
    /// First-axis term.
    pub first_word: String,
    /// Second-axis term.
    pub second_word: String,
    /// Why it was close.
    #[serde(default)]
    pub reason: Option<String>,
}

/// The structured outcome of mediated selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeSelection {
    /// Gating decision.
    pub decision: Decision,
    /// First-axis term, present when approved.
    pub first_word: Option<String>,
    /// Second-axis term, present when approved.
    pub second_word: Option<String>,
    /// Short tagline.
    pub tagline: Option<String>,
    /// Reasoning narrative.
    pub reasoning: String,
    /// Ranked close alternatives.
    pub alternatives: Vec<ArchetypeAlternative>,
    /// Optional likelihood score.
    pub likelihood: Option<f64>,
}

impl ArchetypeSelection {
    /// Returns `"First Second"` when both terms are present.
    #[must_use]
    pub fn pair_label(&self) -> Option<String> {
        match (&self.first_word, &self.second_word) {
            (Some(first), Some(second)) => Some(format!("{first} {second}")),
            _ => None,
        }
    }
}

/// The categorical outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Rule-table winner.
    Category {
        /// Winning category identifier.
        category_id: String,
        /// Winning category name.
        name: String,
        /// Winning category's static description.
        description: String,
        /// Every category's score in declaration order.
        scores: Vec<CategoryScore>,
    },
    /// Mediated selection.
    Archetype(ArchetypeSelection),
}

/// The computed result of a run, together with the responses it was
/// derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// The categorical outcome.
    pub outcome: Outcome,
    /// Explanation shown with the result. Falls back to the category's
    /// static description (or the selection reasoning) when enrichment is
    /// unavailable.
    pub explanation: String,
    /// The full ordered response list used for scoring.
    pub responses: Vec<Response>,
    /// When the result was computed.
    pub computed_at: DateTime<Utc>,
}
