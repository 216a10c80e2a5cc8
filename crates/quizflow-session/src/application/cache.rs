//! Resumable session cache with a freshness window.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use quizflow_core::clock::Clock;
use quizflow_core::quiz::QuizDefinition;
use quizflow_core::store::{SessionKey, SessionStore};
use tracing::{debug, info, warn};

use crate::domain::session::Session;

/// Entries at least this old are discarded on read.
pub const FRESHNESS_WINDOW_HOURS: i64 = 24;

/// Wraps a `SessionStore` with freshness and definition checks.
///
/// Store failures never surface to callers: a failed load behaves like an
/// empty cache and a failed write is logged and dropped.
#[derive(Clone)]
pub struct SessionCache {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    window: Duration,
}

impl SessionCache {
    /// Creates a cache using the default freshness window.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            window: Duration::hours(FRESHNESS_WINDOW_HOURS),
        }
    }

    /// Overrides the freshness window.
    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// The clock used for freshness checks.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Whether something last touched at `touched_at` is past the freshness
    /// window.
    #[must_use]
    pub fn is_stale(&self, touched_at: DateTime<Utc>) -> bool {
        self.clock.elapsed_since(touched_at) >= self.window
    }

    /// Restores the participant's session for `quiz`, if a fresh one exists.
    ///
    /// Stale entries and entries that no longer fit the quiz definition are
    /// deleted.
    pub async fn restore(&self, quiz: &QuizDefinition, participant: &str) -> Option<Session> {
        let key = SessionKey::new(participant, quiz.id.clone());
        let snapshot = match self.store.load(&key).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return None,
            Err(e) => {
                warn!(quiz_id = %quiz.id, error = %e, "failed to load session snapshot");
                return None;
            }
        };

        if self.is_stale(snapshot.touched_at) {
            let age = self.clock.elapsed_since(snapshot.touched_at);
            info!(quiz_id = %quiz.id, age_minutes = age.num_minutes(), "discarding stale session");
            self.discard(&key).await;
            return None;
        }

        match Session::from_snapshot(quiz, snapshot) {
            Ok(session) => {
                debug!(quiz_id = %quiz.id, run_id = %session.run_id(), "restored session");
                Some(session)
            }
            Err(e) => {
                info!(quiz_id = %quiz.id, reason = %e, "discarding incompatible session");
                self.discard(&key).await;
                None
            }
        }
    }

    /// Writes the session's snapshot.
    pub async fn persist(&self, session: &Session) {
        if let Err(e) = self.store.save(&session.to_snapshot()).await {
            warn!(
                quiz_id = %session.key().quiz_id,
                run_id = %session.run_id(),
                error = %e,
                "failed to persist session snapshot"
            );
        }
    }

    /// Deletes whatever is stored under `key`.
    pub async fn discard(&self, key: &SessionKey) {
        if let Err(e) = self.store.delete(key).await {
            warn!(quiz_id = %key.quiz_id, error = %e, "failed to delete session snapshot");
        }
    }
}
