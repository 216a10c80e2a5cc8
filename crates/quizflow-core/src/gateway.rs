//! Contracts for the external collaborators the engine calls.
//!
//! Every collaborator is a black box reached over JSON/HTTP in production.
//! Request types serialize to the wire shape directly.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::quiz::{Personalization, WordMatrix};
use crate::response::{ResultRecord, Response};

/// Failure talking to an external collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The service could not be reached.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The call did not settle within the configured timeout.
    #[error("call timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("service returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Awaits a collaborator call, failing with `GatewayError::Timeout` if it
/// does not settle within `limit`.
///
/// # Errors
///
/// Returns the call's own error, or `GatewayError::Timeout`.
pub async fn call_with_timeout<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, GatewayError>>,
) -> Result<T, GatewayError> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(GatewayError::Timeout))
}

/// Request body for `start`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// Quiz identifier.
    pub quiz_id: String,
    /// Participant session token.
    pub session_token: String,
    /// Number of declared questions.
    pub total_steps: usize,
    /// Personalization collected before the first question.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personalization_data: Option<Personalization>,
}

/// Request body for `saveStep`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveStepRequest {
    /// Remote session handle.
    pub session_id: String,
    /// Every response so far.
    pub responses: Vec<Response>,
    /// One-based step number of the latest response.
    pub step_number: usize,
    /// Number of declared questions.
    pub total_steps: usize,
}

/// Request body for `adaptNarrative`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptNarrativeRequest {
    /// The question's base narrative.
    pub base_scenario: String,
    /// Responses collected so far.
    pub previous_responses: Vec<Response>,
    /// The quiz's story framing.
    pub story_setup: String,
    /// Personalization collected before the first question.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personalization_data: Option<Personalization>,
}

/// Request body for `classifyBranch`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyBranchRequest {
    /// Quiz identifier.
    pub quiz_id: String,
    /// The question the free text answered.
    pub question_id: String,
    /// The typed text.
    pub custom_input: String,
    /// Visited question identifiers.
    pub current_path: Vec<String>,
}

/// What an explanation is requested for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExplainSubject {
    /// A rule-table category.
    Category {
        /// Category identifier.
        #[serde(rename = "categoryId")]
        category_id: String,
    },
    /// A mediated word pair.
    Archetype {
        /// First-axis term.
        #[serde(rename = "firstWord")]
        first_word: String,
        /// Second-axis term.
        #[serde(rename = "secondWord")]
        second_word: String,
    },
}

/// Request body for `explain`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainRequest {
    /// Remote session handle, when one exists.
    pub session_id: Option<String>,
    /// The result being explained.
    #[serde(flatten)]
    pub subject: ExplainSubject,
    /// Every response of the run.
    pub responses: Vec<Response>,
    /// The quiz's opaque prompt configuration.
    pub prompt_config: serde_json::Value,
}

/// One turn of the transcript sent for mediated selection. Always built
/// from base question text, never adapted display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Base question text.
    pub question: String,
    /// Chosen label or typed text.
    pub answer: String,
}

/// Request body for `selectArchetype`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectArchetypeRequest {
    /// Remote session handle, when one exists.
    pub session_id: Option<String>,
    /// Quiz identifier.
    pub quiz_id: String,
    /// Ordered transcript.
    pub responses: Vec<TranscriptEntry>,
    /// Closed vocabulary and guidance.
    pub word_matrix: WordMatrix,
}

/// Request body for `complete`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    /// Quiz identifier.
    pub quiz_id: String,
    /// Remote session handle, when one exists.
    pub session_id: Option<String>,
    /// Every response of the run.
    pub responses: Vec<Response>,
    /// Personalization collected before the first question.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personalization_data: Option<Personalization>,
    /// The computed result.
    pub result: ResultRecord,
}

/// A follow-up quiz suggested after results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Recommendation identifier.
    pub recommendation_id: String,
    /// The suggested quiz.
    pub quiz: RecommendedQuiz,
    /// Why it was suggested.
    pub reasoning: String,
    /// Call-to-action text.
    pub cta: String,
}

/// Summary of a recommended quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedQuiz {
    /// Quiz identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Short description.
    pub description: String,
}

/// Remote session log: handle creation, step logging, and the final
/// durable write. Never read back by the engine.
#[async_trait]
pub trait SessionLog: Send + Sync {
    /// Creates a remote session handle.
    async fn start(&self, request: StartRequest) -> Result<String, GatewayError>;

    /// Appends a progress step.
    async fn save_step(&self, request: SaveStepRequest) -> Result<(), GatewayError>;

    /// Records the completed run. Returns the remote session handle.
    async fn complete(&self, request: CompleteRequest) -> Result<String, GatewayError>;
}

/// Rewrites a question's display text for narrative continuity.
#[async_trait]
pub trait NarrativeAdapter: Send + Sync {
    /// Returns the adapted display text.
    async fn adapt(&self, request: AdaptNarrativeRequest) -> Result<String, GatewayError>;
}

/// Routes free-text answers to a branch target.
#[async_trait]
pub trait BranchClassifier: Send + Sync {
    /// Returns the target question identifier, if the classifier chose one.
    async fn classify(&self, request: ClassifyBranchRequest)
    -> Result<Option<String>, GatewayError>;
}

/// External reasoning used by the scorers.
#[async_trait]
pub trait ResultReasoner: Send + Sync {
    /// Returns an explanation of a computed result.
    async fn explain(&self, request: ExplainRequest) -> Result<String, GatewayError>;

    /// Returns the raw structured text of an archetype selection. Parsing is
    /// the scorer's job so that malformed replies can be recovered.
    async fn select_archetype(&self, request: SelectArchetypeRequest)
    -> Result<String, GatewayError>;
}

/// Suggests a follow-up quiz after results.
#[async_trait]
pub trait Recommender: Send + Sync {
    /// Returns a recommendation for the remote session.
    async fn recommend(&self, session_id: &str) -> Result<Recommendation, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explain_request_flattens_archetype_subject_into_camel_case_body() {
        // Arrange
        let request = ExplainRequest {
            session_id: Some("remote-1".to_owned()),
            subject: ExplainSubject::Archetype {
                first_word: "Bold".to_owned(),
                second_word: "Explorer".to_owned(),
            },
            responses: Vec::new(),
            prompt_config: serde_json::json!({ "tone": "warm" }),
        };

        // Act
        let body = serde_json::to_value(&request).unwrap();

        // Assert
        assert_eq!(body["sessionId"], "remote-1");
        assert_eq!(body["firstWord"], "Bold");
        assert_eq!(body["secondWord"], "Explorer");
        assert_eq!(body["promptConfig"]["tone"], "warm");
    }

    #[tokio::test]
    async fn test_call_with_timeout_reports_timeout_for_hanging_call() {
        let result: Result<(), GatewayError> = call_with_timeout(
            Duration::from_millis(10),
            std::future::pending::<Result<(), GatewayError>>(),
        )
        .await;

        assert_eq!(result, Err(GatewayError::Timeout));
    }

    #[test]
    fn test_start_request_omits_missing_personalization() {
        let request = StartRequest {
            quiz_id: "q".to_owned(),
            session_token: "tok".to_owned(),
            total_steps: 3,
            personalization_data: None,
        };

        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["totalSteps"], 3);
        assert!(body.get("personalizationData").is_none());
    }
}
