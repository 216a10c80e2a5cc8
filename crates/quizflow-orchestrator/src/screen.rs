//! Render-ready view of the orchestrator state.

use quizflow_core::gateway::Recommendation;
use quizflow_core::quiz::PersonalizationField;
use quizflow_core::response::ResultRecord;
use serde::Serialize;

/// A selectable option as shown to the participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    /// Display label.
    pub label: String,
    /// Value token to submit.
    pub value: String,
}

/// What the participant should currently see.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum Screen {
    /// Quiz introduction.
    Welcome {
        /// Quiz identifier.
        quiz_id: String,
        /// Quiz title.
        title: String,
        /// Quiz description.
        description: String,
        /// Number of questions declared.
        total_steps: usize,
    },
    /// Personalization form shown before the first question.
    Personalization {
        /// Fields to collect.
        fields: Vec<PersonalizationField>,
    },
    /// A question awaiting an answer.
    Question {
        /// Declaration index.
        index: usize,
        /// Question identifier.
        question_id: String,
        /// One-based position along the path.
        step: usize,
        /// Number of questions declared.
        total_steps: usize,
        /// Text to show, adapted when available.
        display_text: String,
        /// Selectable options.
        options: Vec<OptionView>,
        /// Whether a typed answer is accepted.
        allow_free_text: bool,
    },
    /// Every answer is in and the result is pending.
    Analyzing {
        /// The last analysis failure; retry or restart to continue.
        error: Option<String>,
    },
    /// The computed result.
    Results {
        /// The result record.
        result: ResultRecord,
    },
    /// A follow-up recommendation over the result.
    Recommendation {
        /// The result record.
        result: ResultRecord,
        /// The recommendation.
        recommendation: Recommendation,
    },
}

impl Screen {
    /// Short name used in transition errors and logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "welcome",
            Self::Personalization { .. } => "personalization",
            Self::Question { .. } => "question",
            Self::Analyzing { .. } => "analyzing",
            Self::Results { .. } => "results",
            Self::Recommendation { .. } => "recommendation",
        }
    }
}
