//! `PostgreSQL` implementation of the `SessionStore` trait.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use quizflow_core::error::DomainError;
use quizflow_core::store::{SessionKey, SessionSnapshot, SessionStore};

/// PostgreSQL-backed session store. One row per participant and quiz; the
/// snapshot is stored as JSONB and overwritten on every save.
#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Creates a new `PgSessionStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn infrastructure(context: &str, error: impl std::fmt::Display) -> DomainError {
    DomainError::Infrastructure(format!("{context}: {error}"))
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn load(&self, key: &SessionKey) -> Result<Option<SessionSnapshot>, DomainError> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as(
            "SELECT snapshot FROM quiz_sessions WHERE participant = $1 AND quiz_id = $2",
        )
        .bind(&key.participant)
        .bind(&key.quiz_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| infrastructure("failed to load session", e))?;

        row.map(|(snapshot,)| {
            serde_json::from_value(snapshot)
                .map_err(|e| infrastructure("session snapshot deserialization failed", e))
        })
        .transpose()
    }

    async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), DomainError> {
        let payload = serde_json::to_value(snapshot)
            .map_err(|e| infrastructure("session snapshot serialization failed", e))?;

        sqlx::query(
            r"
            INSERT INTO quiz_sessions (participant, quiz_id, snapshot, touched_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (participant, quiz_id)
            DO UPDATE SET snapshot = EXCLUDED.snapshot, touched_at = EXCLUDED.touched_at
            ",
        )
        .bind(&snapshot.participant)
        .bind(&snapshot.quiz_id)
        .bind(payload)
        .bind(snapshot.touched_at)
        .execute(&self.pool)
        .await
        .map_err(|e| infrastructure("failed to save session", e))?;

        debug!(quiz_id = %snapshot.quiz_id, run_id = %snapshot.run_id, "session snapshot saved");
        Ok(())
    }

    async fn delete(&self, key: &SessionKey) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM quiz_sessions WHERE participant = $1 AND quiz_id = $2")
            .bind(&key.participant)
            .bind(&key.quiz_id)
            .execute(&self.pool)
            .await
            .map_err(|e| infrastructure("failed to delete session", e))?;
        Ok(())
    }
}
