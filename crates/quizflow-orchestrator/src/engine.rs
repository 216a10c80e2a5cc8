//! The per-participant quiz state machine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use quizflow_branching::{BranchDecision, Selection, resolve_next};
use quizflow_core::clock::Clock;
use quizflow_core::error::DomainError;
use quizflow_core::gateway::{CompleteRequest, Recommendation, StartRequest, call_with_timeout};
use quizflow_core::quiz::{Personalization, QuizDefinition};
use quizflow_core::response::Answer;
use quizflow_core::store::SessionKey;
use quizflow_narrative::display_text;
use quizflow_scoring::{ScoringContext, compute_result};
use quizflow_session::application::cache::SessionCache;
use quizflow_session::application::progress::ProgressReporter;
use quizflow_session::domain::session::{Session, SessionPhase};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::collaborators::Collaborators;
use crate::config::EngineConfig;
use crate::screen::{OptionView, Screen};

const INTERRUPTED_ANALYSIS: &str = "analysis was interrupted; retry to continue";

/// Result of a guarded operation.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The operation was applied; this is the new screen.
    Advanced(Screen),
    /// Another submission was in flight, so nothing happened.
    Ignored,
    /// The run was restarted while the operation awaited a collaborator,
    /// so its result was dropped.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Phase {
    #[default]
    Welcome,
    Personalization,
    Question,
    Analyzing,
    Results,
    Recommendation,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Personalization => "personalization",
            Self::Question => "question",
            Self::Analyzing => "analyzing",
            Self::Results => "results",
            Self::Recommendation => "recommendation",
        }
    }
}

#[derive(Debug, Default)]
struct RunState {
    phase: Phase,
    session: Option<Session>,
    analysis_error: Option<String>,
    recommendation: Option<Recommendation>,
    generation: u64,
    mounted: bool,
}

impl RunState {
    fn require(&self, phase: Phase, operation: &'static str) -> Result<(), DomainError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                screen: self.phase.name(),
                operation,
            })
        }
    }

    fn active_session(&self) -> Result<&Session, DomainError> {
        self.session
            .as_ref()
            .ok_or_else(|| DomainError::Validation("no active session".to_owned()))
    }

    fn session_for_run(&mut self, run_id: Uuid) -> Option<&mut Session> {
        self.session.as_mut().filter(|s| s.run_id() == run_id)
    }
}

/// Releases the submission flag when dropped.
struct SubmissionGuard<'a>(&'a AtomicBool);

impl<'a> SubmissionGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives one participant through one quiz.
///
/// State lives behind a mutex that is never held across an await. Every
/// result that arrives after an await is applied only if the run it was
/// issued for is still current, so a restart mid-flight drops it.
pub struct Orchestrator {
    quiz: Arc<QuizDefinition>,
    participant: String,
    cache: SessionCache,
    reporter: ProgressReporter,
    collaborators: Collaborators,
    config: EngineConfig,
    state: Mutex<RunState>,
    submitting: AtomicBool,
}

impl Orchestrator {
    /// Creates an orchestrator showing the welcome screen. Call `mount` to
    /// resume a persisted session.
    #[must_use]
    pub fn new(
        quiz: Arc<QuizDefinition>,
        participant: impl Into<String>,
        cache: SessionCache,
        reporter: ProgressReporter,
        collaborators: Collaborators,
        config: EngineConfig,
    ) -> Self {
        Self {
            quiz,
            participant: participant.into(),
            cache,
            reporter,
            collaborators,
            config,
            state: Mutex::default(),
            submitting: AtomicBool::new(false),
        }
    }

    /// The quiz being run.
    #[must_use]
    pub fn quiz(&self) -> &QuizDefinition {
        &self.quiz
    }

    /// The participant's session token.
    #[must_use]
    pub fn participant(&self) -> &str {
        &self.participant
    }

    /// The screen currently showing.
    #[must_use]
    pub fn screen(&self) -> Screen {
        self.render(&self.lock())
    }

    /// Restores a live persisted session, once. Later calls return the
    /// current screen, unless the session held in memory has outlived the
    /// freshness window, in which case the run is discarded as on restart.
    #[instrument(skip(self), fields(quiz_id = %self.quiz.id))]
    pub async fn mount(&self) -> Screen {
        let (mounted, stale) = {
            let state = self.lock();
            let stale = state
                .session
                .as_ref()
                .is_some_and(|s| self.cache.is_stale(s.touched_at()));
            (state.mounted, stale)
        };
        if stale {
            info!("session outlived the freshness window, returning to welcome");
            return self.restart().await;
        }
        if mounted {
            return self.screen();
        }

        let restored = self.cache.restore(&self.quiz, &self.participant).await;

        let mut state = self.lock();
        if !state.mounted {
            state.mounted = true;
            if let Some(session) = restored {
                let phase = match session.phase() {
                    SessionPhase::Answering => Phase::Question,
                    SessionPhase::Analyzing => {
                        state.analysis_error = Some(INTERRUPTED_ANALYSIS.to_owned());
                        Phase::Analyzing
                    }
                    SessionPhase::Completed => Phase::Results,
                };
                state.phase = phase;
                info!(
                    run_id = %session.run_id(),
                    screen = state.phase.name(),
                    answered = session.responses().len(),
                    "resumed session"
                );
                state.session = Some(session);
            }
        }
        self.render(&state)
    }

    /// Leaves the welcome screen.
    ///
    /// Goes to the personalization form when the quiz declares one;
    /// otherwise opens the remote session and shows the first question.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` unless on the welcome
    /// screen.
    #[instrument(skip(self), fields(quiz_id = %self.quiz.id))]
    pub async fn begin(&self) -> Result<SubmitOutcome, DomainError> {
        let Some(_guard) = SubmissionGuard::acquire(&self.submitting) else {
            return Ok(SubmitOutcome::Ignored);
        };

        let generation = {
            let mut state = self.lock();
            state.require(Phase::Welcome, "begin")?;
            if self.quiz.requires_personalization() {
                state.phase = Phase::Personalization;
                return Ok(SubmitOutcome::Advanced(self.render(&state)));
            }
            state.generation
        };

        self.start_run(generation, None).await
    }

    /// Accepts the personalization form and shows the first question.
    ///
    /// Values are trimmed; blank optional values are dropped.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` unless on the
    /// personalization screen, and `DomainError::Validation` when a required
    /// field is missing or blank or an undeclared field is submitted.
    #[instrument(skip(self, data), fields(quiz_id = %self.quiz.id))]
    pub async fn submit_personalization(
        &self,
        data: Personalization,
    ) -> Result<SubmitOutcome, DomainError> {
        let Some(_guard) = SubmissionGuard::acquire(&self.submitting) else {
            return Ok(SubmitOutcome::Ignored);
        };

        let generation = {
            let state = self.lock();
            state.require(Phase::Personalization, "submit personalization")?;
            state.generation
        };
        let cleaned = self.clean_personalization(data)?;

        self.start_run(generation, Some(cleaned)).await
    }

    /// Records an answer to the current question and moves on.
    ///
    /// While one submission is in flight, further submissions return
    /// `SubmitOutcome::Ignored` and record nothing.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` unless a question is
    /// showing, and `DomainError::Validation` for an answer the question
    /// does not accept.
    #[instrument(skip(self, answer), fields(quiz_id = %self.quiz.id))]
    pub async fn submit_answer(&self, answer: Answer) -> Result<SubmitOutcome, DomainError> {
        let Some(_guard) = SubmissionGuard::acquire(&self.submitting) else {
            debug!("submission already in flight, ignoring");
            return Ok(SubmitOutcome::Ignored);
        };

        // The answer is recorded on a copy that replaces the live session
        // only once the turn has fully resolved. A turn that fails or is
        // dropped part way leaves the question answerable.
        let now = self.now();
        let (mut pending, response) = {
            let state = self.lock();
            state.require(Phase::Question, "submit an answer")?;
            let mut pending = state.active_session()?.clone();
            let response = pending.record_response(&self.quiz, &answer, now)?;
            (pending, response)
        };
        let run_id = pending.run_id();
        info!(
            question_id = %response.question_id,
            step = pending.responses().len(),
            custom = response.is_custom,
            "answer recorded"
        );

        self.reporter.report(
            pending.remote_session_id(),
            pending.responses(),
            self.quiz.total_steps(),
        );

        let question = self
            .quiz
            .question(response.question_index)
            .ok_or_else(|| DomainError::Validation("answered question vanished".to_owned()))?;
        let selection = if response.is_custom {
            Selection::FreeText(&response.value)
        } else {
            question
                .option_by_value(&response.value)
                .map_or(Selection::FreeText(&response.value), Selection::Option)
        };

        let decision = resolve_next(
            &self.quiz,
            response.question_index,
            selection,
            pending.path(),
            self.collaborators.classifier.as_deref(),
            self.config.call_timeout,
        )
        .await;

        match decision {
            BranchDecision::Next { index, via } => {
                debug!(next_index = index, ?via, "branch resolved");
                let text = display_text(
                    &self.quiz,
                    index,
                    pending.responses(),
                    pending.personalization(),
                    self.collaborators.narrative.as_deref(),
                    self.config.call_timeout,
                )
                .await;
                pending.advance_to(&self.quiz, index, text, self.now())?;

                let screen = {
                    let mut state = self.lock();
                    if state.session_for_run(run_id).is_none() {
                        info!(%run_id, "run restarted mid-flight, dropping next question");
                        return Ok(SubmitOutcome::Discarded);
                    }
                    state.session = Some(pending.clone());
                    state.phase = Phase::Question;
                    self.render(&state)
                };
                self.cache.persist(&pending).await;
                Ok(SubmitOutcome::Advanced(screen))
            }
            BranchDecision::Complete => {
                pending.begin_analysis(self.now())?;
                {
                    let mut state = self.lock();
                    if state.session_for_run(run_id).is_none() {
                        info!(%run_id, "run restarted mid-flight, skipping analysis");
                        return Ok(SubmitOutcome::Discarded);
                    }
                    state.session = Some(pending.clone());
                    state.phase = Phase::Analyzing;
                    state.analysis_error = None;
                }
                info!(answered = pending.responses().len(), "all answers collected");
                self.cache.persist(&pending).await;
                self.analyze(&pending).await
            }
        }
    }

    /// Re-runs scoring over the same responses after an analysis failure.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` unless on the analyzing
    /// screen.
    #[instrument(skip(self), fields(quiz_id = %self.quiz.id))]
    pub async fn retry_analysis(&self) -> Result<SubmitOutcome, DomainError> {
        let Some(_guard) = SubmissionGuard::acquire(&self.submitting) else {
            return Ok(SubmitOutcome::Ignored);
        };

        let session = {
            let mut state = self.lock();
            state.require(Phase::Analyzing, "retry analysis")?;
            let session = state.active_session()?.clone();
            state.analysis_error = None;
            session
        };
        self.analyze(&session).await
    }

    /// Returns to the welcome screen and deletes the persisted session.
    ///
    /// Allowed from any screen. Anything still in flight for the previous
    /// run is dropped when it returns.
    #[instrument(skip(self), fields(quiz_id = %self.quiz.id))]
    pub async fn restart(&self) -> Screen {
        let screen = {
            let mut state = self.lock();
            let previous = state.session.as_ref().map(Session::run_id);
            *state = RunState {
                generation: state.generation + 1,
                mounted: true,
                ..RunState::default()
            };
            if let Some(run_id) = previous {
                info!(%run_id, "run restarted");
            }
            self.render(&state)
        };
        self.cache
            .discard(&SessionKey::new(self.participant.clone(), self.quiz.id.clone()))
            .await;
        screen
    }

    /// Fetches a follow-up recommendation over the results.
    ///
    /// A missing recommender, missing remote handle, or failed call leaves
    /// the results screen showing.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` unless on the results
    /// screen.
    #[instrument(skip(self), fields(quiz_id = %self.quiz.id))]
    pub async fn show_recommendation(&self) -> Result<SubmitOutcome, DomainError> {
        let Some(_guard) = SubmissionGuard::acquire(&self.submitting) else {
            return Ok(SubmitOutcome::Ignored);
        };

        let (run_id, session_id) = {
            let state = self.lock();
            state.require(Phase::Results, "show a recommendation")?;
            let session = state.active_session()?;
            (
                session.run_id(),
                session.remote_session_id().map(str::to_owned),
            )
        };

        let (Some(recommender), Some(session_id)) =
            (self.collaborators.recommender.clone(), session_id)
        else {
            warn!("no recommender or remote session, staying on results");
            return Ok(SubmitOutcome::Advanced(self.screen()));
        };

        match call_with_timeout(self.config.call_timeout, recommender.recommend(&session_id)).await
        {
            Ok(recommendation) => {
                let mut state = self.lock();
                if state.session_for_run(run_id).is_none() || state.phase != Phase::Results {
                    return Ok(SubmitOutcome::Discarded);
                }
                info!(recommendation_id = %recommendation.recommendation_id, "recommendation shown");
                state.recommendation = Some(recommendation);
                state.phase = Phase::Recommendation;
                Ok(SubmitOutcome::Advanced(self.render(&state)))
            }
            Err(e) => {
                warn!(error = %e, "recommendation failed, staying on results");
                Ok(SubmitOutcome::Advanced(self.screen()))
            }
        }
    }

    /// Returns from the recommendation to the results.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` unless a recommendation is
    /// showing.
    pub fn close_recommendation(&self) -> Result<Screen, DomainError> {
        let mut state = self.lock();
        state.require(Phase::Recommendation, "close the recommendation")?;
        state.recommendation = None;
        state.phase = Phase::Results;
        Ok(self.render(&state))
    }

    async fn start_run(
        &self,
        generation: u64,
        personalization: Option<Personalization>,
    ) -> Result<SubmitOutcome, DomainError> {
        let remote_session_id = self.open_remote_session(personalization.as_ref()).await;
        let session = Session::start(
            &self.quiz,
            &self.participant,
            remote_session_id,
            personalization,
            self.now(),
        )?;

        let screen = {
            let mut state = self.lock();
            if state.generation != generation {
                return Ok(SubmitOutcome::Discarded);
            }
            state.session = Some(session.clone());
            state.phase = Phase::Question;
            self.render(&state)
        };
        info!(run_id = %session.run_id(), remote = session.remote_session_id().is_some(), "run started");
        self.cache.persist(&session).await;
        Ok(SubmitOutcome::Advanced(screen))
    }

    async fn open_remote_session(&self, personalization: Option<&Personalization>) -> Option<String> {
        let log = self.collaborators.session_log.as_ref()?;
        let request = StartRequest {
            quiz_id: self.quiz.id.clone(),
            session_token: self.participant.clone(),
            total_steps: self.quiz.total_steps(),
            personalization_data: personalization.cloned(),
        };
        match call_with_timeout(self.config.call_timeout, log.start(request)).await {
            Ok(session_id) => Some(session_id),
            Err(e) => {
                warn!(error = %e, "failed to open remote session, continuing without one");
                None
            }
        }
    }

    async fn analyze(&self, session: &Session) -> Result<SubmitOutcome, DomainError> {
        let run_id = session.run_id();
        let outcome = compute_result(ScoringContext {
            quiz: &self.quiz,
            responses: session.responses(),
            session_id: session.remote_session_id(),
            reasoner: self.collaborators.reasoner.as_deref(),
            timeout: self.config.call_timeout,
            now: self.now(),
        })
        .await;

        let (screen, completed) = {
            let mut state = self.lock();
            let Some(current) = state.session_for_run(run_id) else {
                info!(%run_id, "run restarted mid-flight, dropping result");
                return Ok(SubmitOutcome::Discarded);
            };
            let completed = match outcome {
                Ok(record) => {
                    current.complete(record, self.now())?;
                    let completed = current.clone();
                    state.phase = Phase::Results;
                    state.analysis_error = None;
                    Some(completed)
                }
                Err(e) => {
                    warn!(error = %e, "analysis failed");
                    state.analysis_error = Some(e.to_string());
                    None
                }
            };
            (self.render(&state), completed)
        };

        if let Some(completed) = completed {
            info!(%run_id, "result computed");
            self.cache.persist(&completed).await;
            self.record_completion(&completed);
        }
        Ok(SubmitOutcome::Advanced(screen))
    }

    fn record_completion(&self, session: &Session) {
        let Some(result) = session.result().cloned() else {
            return;
        };
        self.reporter.report_completion(CompleteRequest {
            quiz_id: self.quiz.id.clone(),
            session_id: session.remote_session_id().map(str::to_owned),
            responses: session.responses().to_vec(),
            personalization_data: session.personalization().cloned(),
            result,
        });
    }

    fn clean_personalization(&self, data: Personalization) -> Result<Personalization, DomainError> {
        let fields = self
            .quiz
            .personalization
            .as_ref()
            .map(|step| step.fields.as_slice())
            .unwrap_or_default();

        if let Some(unknown) = data
            .keys()
            .find(|key| !fields.iter().any(|field| &field.key == *key))
        {
            return Err(DomainError::Validation(format!(
                "unknown personalization field '{unknown}'"
            )));
        }

        let mut cleaned = Personalization::new();
        let mut missing = Vec::new();
        for field in fields {
            match data.get(&field.key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
                Some(value) => {
                    cleaned.insert(field.key.clone(), value.to_owned());
                }
                None if field.required => missing.push(field.key.as_str()),
                None => {}
            }
        }
        if !missing.is_empty() {
            return Err(DomainError::Validation(format!(
                "missing personalization fields: {}",
                missing.join(", ")
            )));
        }
        Ok(cleaned)
    }

    fn render(&self, state: &RunState) -> Screen {
        let session = state.session.as_ref();
        let analyzing = || Screen::Analyzing {
            error: state.analysis_error.clone(),
        };
        match state.phase {
            Phase::Welcome => self.welcome(),
            Phase::Personalization => Screen::Personalization {
                fields: self
                    .quiz
                    .personalization
                    .as_ref()
                    .map(|step| step.fields.clone())
                    .unwrap_or_default(),
            },
            Phase::Question => session
                .and_then(|s| self.question_screen(s))
                .unwrap_or_else(|| self.welcome()),
            Phase::Analyzing => analyzing(),
            Phase::Results => match session.and_then(Session::result) {
                Some(result) => Screen::Results {
                    result: result.clone(),
                },
                None => analyzing(),
            },
            Phase::Recommendation => {
                match (session.and_then(Session::result), &state.recommendation) {
                    (Some(result), Some(recommendation)) => Screen::Recommendation {
                        result: result.clone(),
                        recommendation: recommendation.clone(),
                    },
                    (Some(result), None) => Screen::Results {
                        result: result.clone(),
                    },
                    (None, _) => analyzing(),
                }
            }
        }
    }

    fn welcome(&self) -> Screen {
        Screen::Welcome {
            quiz_id: self.quiz.id.clone(),
            title: self.quiz.title.clone(),
            description: self.quiz.description.clone(),
            total_steps: self.quiz.total_steps(),
        }
    }

    fn question_screen(&self, session: &Session) -> Option<Screen> {
        let index = session.current_question_index();
        let question = self.quiz.question(index)?;
        Some(Screen::Question {
            index,
            question_id: question.id.clone(),
            step: session.path().len(),
            total_steps: self.quiz.total_steps(),
            display_text: session.display_text().to_owned(),
            options: question
                .options
                .iter()
                .map(|o| OptionView {
                    label: o.label.clone(),
                    value: o.value.clone(),
                })
                .collect(),
            allow_free_text: question.allow_free_text,
        })
    }

    fn now(&self) -> DateTime<Utc> {
        self.cache.clock().now()
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
