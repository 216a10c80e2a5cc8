//! Shared application state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use quizflow_catalog::application::catalog::QuizCatalog;
use quizflow_core::clock::Clock;
use quizflow_core::error::DomainError;
use quizflow_core::store::{SessionKey, SessionStore};
use quizflow_orchestrator::{Collaborators, EngineConfig, Orchestrator};
use quizflow_session::application::cache::SessionCache;
use quizflow_session::application::progress::ProgressReporter;
use tracing::debug;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Every loaded quiz.
    pub catalog: Arc<QuizCatalog>,
    /// Freshness-checked session cache.
    pub cache: SessionCache,
    /// Background progress reporting, drained on shutdown.
    pub reporter: ProgressReporter,
    /// External collaborators.
    pub collaborators: Collaborators,
    /// Engine tunables.
    pub config: EngineConfig,
    runs: Arc<Mutex<HashMap<SessionKey, RunEntry>>>,
}

struct RunEntry {
    orchestrator: Arc<Orchestrator>,
    last_used: DateTime<Utc>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        catalog: QuizCatalog,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        collaborators: Collaborators,
        config: EngineConfig,
    ) -> Self {
        let reporter = ProgressReporter::new(collaborators.session_log.clone(), config.call_timeout);
        Self {
            catalog: Arc::new(catalog),
            cache: SessionCache::new(store, clock),
            reporter,
            collaborators,
            config,
            runs: Arc::default(),
        }
    }

    /// Returns the participant's orchestrator for `quiz_id`, creating and
    /// mounting it on first use.
    ///
    /// Orchestrators left idle for longer than the freshness window are
    /// dropped from the registry first, so a returning participant gets a
    /// fresh one that resumes from the store.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::QuizNotFound` for an unknown quiz.
    pub async fn run(&self, quiz_id: &str, participant: &str) -> Result<Arc<Orchestrator>, DomainError> {
        let quiz = self.catalog.get(quiz_id)?;
        let key = SessionKey::new(participant, quiz_id);
        let now = self.cache.clock().now();

        let orchestrator = {
            let mut runs = self.runs.lock().unwrap_or_else(PoisonError::into_inner);
            let before = runs.len();
            runs.retain(|_, entry| !self.cache.is_stale(entry.last_used));
            if runs.len() < before {
                debug!(evicted = before - runs.len(), "evicted idle runs");
            }

            let entry = runs.entry(key).or_insert_with(|| RunEntry {
                orchestrator: Arc::new(Orchestrator::new(
                    quiz,
                    participant,
                    self.cache.clone(),
                    self.reporter.clone(),
                    self.collaborators.clone(),
                    self.config,
                )),
                last_used: now,
            });
            entry.last_used = now;
            entry.orchestrator.clone()
        };

        orchestrator.mount().await;
        Ok(orchestrator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use quizflow_test_support::{
        InMemorySessionStore, ManualClock, ScriptedCollaborators, linear_quiz,
    };

    fn state(clock: Arc<ManualClock>) -> AppState {
        let catalog = QuizCatalog::from_definitions([linear_quiz()]).unwrap();
        AppState::new(
            catalog,
            Arc::new(InMemorySessionStore::new()),
            clock,
            Collaborators::all(Arc::new(ScriptedCollaborators::new())),
            EngineConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_run_is_reused_within_window() {
        // Arrange
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        ));
        let state = state(clock.clone());
        let first = state.run("trail", "participant-1").await.unwrap();

        // Act
        clock.advance(chrono::Duration::hours(23));
        let second = state.run("trail", "participant-1").await.unwrap();

        // Assert
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_idle_run_is_evicted_after_window() {
        // Arrange
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        ));
        let state = state(clock.clone());
        let first = state.run("trail", "participant-1").await.unwrap();
        first.begin().await.unwrap();

        // Act
        clock.advance(chrono::Duration::hours(25));
        let second = state.run("trail", "participant-1").await.unwrap();

        // Assert
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(matches!(
            second.screen(),
            quizflow_orchestrator::Screen::Welcome { .. }
        ));
    }
}
