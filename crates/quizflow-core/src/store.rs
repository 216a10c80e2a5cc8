//! Session store abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::quiz::Personalization;
use crate::response::{ResultRecord, Response};

/// Cache key for a persisted session: one live session per participant per
/// quiz.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    /// Participant session token.
    pub participant: String,
    /// Quiz identifier.
    pub quiz_id: String,
}

impl SessionKey {
    /// Creates a new key.
    #[must_use]
    pub fn new(participant: impl Into<String>, quiz_id: impl Into<String>) -> Self {
        Self {
            participant: participant.into(),
            quiz_id: quiz_id.into(),
        }
    }
}

/// The persisted, resumable form of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Quiz identifier.
    pub quiz_id: String,
    /// Participant session token.
    pub participant: String,
    /// Identity of this run; changes on every restart.
    pub run_id: Uuid,
    /// Index of the question currently displayed (or last answered once
    /// analysis has begun).
    pub current_question_index: usize,
    /// Visited question identifiers.
    pub path: Vec<String>,
    /// Every response so far.
    pub responses: Vec<Response>,
    /// Computed result, once available.
    pub result: Option<ResultRecord>,
    /// Remote session handle.
    pub session_id: Option<String>,
    /// Personalization collected before the first question.
    #[serde(default)]
    pub personalization: Option<Personalization>,
    /// Display text of the current question.
    #[serde(default)]
    pub display_text: Option<String>,
    /// Whether every answer is in and the result is pending.
    #[serde(default)]
    pub analyzing: bool,
    /// Fingerprint of the quiz definition the run was started against.
    #[serde(default)]
    pub definition_hash: String,
    /// Last time the session was touched.
    #[serde(with = "chrono::serde::ts_milliseconds", rename = "timestamp_ms")]
    pub touched_at: DateTime<Utc>,
}

impl SessionSnapshot {
    /// Returns the cache key this snapshot is stored under.
    #[must_use]
    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.participant.clone(), self.quiz_id.clone())
    }
}

/// Passive key-value store for session snapshots. Freshness is enforced by
/// the session cache, not by implementations.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the snapshot stored under `key`.
    async fn load(&self, key: &SessionKey) -> Result<Option<SessionSnapshot>, DomainError>;

    /// Inserts or overwrites the snapshot under its key.
    async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), DomainError>;

    /// Removes the snapshot under `key`. Deleting a missing key succeeds.
    async fn delete(&self, key: &SessionKey) -> Result<(), DomainError>;
}
