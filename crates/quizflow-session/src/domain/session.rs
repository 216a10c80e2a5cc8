//! The resumable session value.
//!
//! All mutation goes through the named transitions below so the invariants
//! hold at every step: responses are append-only, each visited question has
//! exactly one response, and the path never repeats a question.

use chrono::{DateTime, Utc};
use quizflow_core::error::DomainError;
use quizflow_core::quiz::{Personalization, QuizDefinition};
use quizflow_core::response::{Answer, ResultRecord, Response};
use quizflow_core::store::{SessionKey, SessionSnapshot};
use uuid::Uuid;

/// Lifecycle phase of a session, derived from its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for an answer to the current question.
    Answering,
    /// Every answer is in; the result is pending.
    Analyzing,
    /// The result has been computed.
    Completed,
}

/// A participant's run through one quiz.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    key: SessionKey,
    run_id: Uuid,
    definition_hash: String,
    current_question_index: usize,
    path: Vec<String>,
    responses: Vec<Response>,
    result: Option<ResultRecord>,
    remote_session_id: Option<String>,
    personalization: Option<Personalization>,
    display_text: String,
    analyzing: bool,
    touched_at: DateTime<Utc>,
}

impl Session {
    /// Starts a run at the first question.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if the quiz has no questions.
    pub fn start(
        quiz: &QuizDefinition,
        participant: &str,
        remote_session_id: Option<String>,
        personalization: Option<Personalization>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let first = quiz.question(0).ok_or_else(|| {
            DomainError::Configuration(format!("quiz '{}' has no questions", quiz.id))
        })?;
        Ok(Self {
            key: SessionKey::new(participant, quiz.id.clone()),
            run_id: Uuid::new_v4(),
            definition_hash: quiz.definition_hash.clone(),
            current_question_index: 0,
            path: vec![first.id.clone()],
            responses: Vec::new(),
            result: None,
            remote_session_id,
            personalization,
            display_text: first.base_narrative().to_owned(),
            analyzing: false,
            touched_at: now,
        })
    }

    /// Cache key.
    #[must_use]
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Identity of this run.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Index of the current question.
    #[must_use]
    pub fn current_question_index(&self) -> usize {
        self.current_question_index
    }

    /// Visited question identifiers, current question last.
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Responses in submission order.
    #[must_use]
    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    /// The computed result.
    #[must_use]
    pub fn result(&self) -> Option<&ResultRecord> {
        self.result.as_ref()
    }

    /// Remote session handle.
    #[must_use]
    pub fn remote_session_id(&self) -> Option<&str> {
        self.remote_session_id.as_deref()
    }

    /// Personalization collected before the first question.
    #[must_use]
    pub fn personalization(&self) -> Option<&Personalization> {
        self.personalization.as_ref()
    }

    /// Display text of the current question.
    #[must_use]
    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    /// Last mutation time.
    #[must_use]
    pub fn touched_at(&self) -> DateTime<Utc> {
        self.touched_at
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        if self.result.is_some() {
            SessionPhase::Completed
        } else if self.analyzing {
            SessionPhase::Analyzing
        } else {
            SessionPhase::Answering
        }
    }

    /// Replaces the current question's display text.
    pub fn set_display_text(&mut self, text: String, now: DateTime<Utc>) {
        self.display_text = text;
        self.touched_at = now;
    }

    /// Records an answer to the current question.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the session is not answering,
    /// the current question was already answered, the choice names no
    /// declared option, or free text is blank or not allowed.
    pub fn record_response(
        &mut self,
        quiz: &QuizDefinition,
        answer: &Answer,
        now: DateTime<Utc>,
    ) -> Result<Response, DomainError> {
        if self.phase() != SessionPhase::Answering {
            return Err(DomainError::Validation(
                "session is not accepting answers".to_owned(),
            ));
        }
        let question = quiz.question(self.current_question_index).ok_or_else(|| {
            DomainError::Validation(format!(
                "question index {} is out of range",
                self.current_question_index
            ))
        })?;
        if self.responses.iter().any(|r| r.question_id == question.id) {
            return Err(DomainError::Validation(format!(
                "question '{}' has already been answered",
                question.id
            )));
        }

        let (selected_label, value, is_custom) = match answer {
            Answer::Choice { value } => {
                let option = question.option_by_value(value).ok_or_else(|| {
                    DomainError::Validation(format!(
                        "question '{}' has no option '{value}'",
                        question.id
                    ))
                })?;
                (option.label.clone(), option.value.clone(), false)
            }
            Answer::FreeText { text } => {
                if !question.allow_free_text {
                    return Err(DomainError::Validation(format!(
                        "question '{}' does not accept free text",
                        question.id
                    )));
                }
                let text = text.trim();
                if text.is_empty() {
                    return Err(DomainError::Validation("free text must not be blank".to_owned()));
                }
                (text.to_owned(), text.to_owned(), true)
            }
        };

        let response = Response {
            question_index: self.current_question_index,
            question_id: question.id.clone(),
            question_text: question.text.clone(),
            selected_label,
            value,
            is_custom,
            answered_at: now,
        };
        self.responses.push(response.clone());
        self.touched_at = now;
        Ok(response)
    }

    /// Moves to the question at `index` after the current one was answered.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the current question is
    /// unanswered, `index` is out of range, or the question was already
    /// visited.
    pub fn advance_to(
        &mut self,
        quiz: &QuizDefinition,
        index: usize,
        display_text: String,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.current_question_answered() {
            return Err(DomainError::Validation(
                "current question has not been answered".to_owned(),
            ));
        }
        let question = quiz.question(index).ok_or_else(|| {
            DomainError::Validation(format!("question index {index} is out of range"))
        })?;
        if self.path.contains(&question.id) {
            return Err(DomainError::Validation(format!(
                "question '{}' was already visited",
                question.id
            )));
        }
        self.path.push(question.id.clone());
        self.current_question_index = index;
        self.display_text = display_text;
        self.touched_at = now;
        Ok(())
    }

    /// Marks every answer as collected.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the current question is
    /// unanswered or a result already exists.
    pub fn begin_analysis(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.result.is_some() || !self.current_question_answered() {
            return Err(DomainError::Validation(
                "session is not ready for analysis".to_owned(),
            ));
        }
        self.analyzing = true;
        self.touched_at = now;
        Ok(())
    }

    /// Stores the computed result.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` unless the session is analyzing.
    pub fn complete(&mut self, result: ResultRecord, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.phase() != SessionPhase::Analyzing {
            return Err(DomainError::Validation(
                "session is not analyzing".to_owned(),
            ));
        }
        self.result = Some(result);
        self.analyzing = false;
        self.touched_at = now;
        Ok(())
    }

    /// Whether the current question already has a response.
    #[must_use]
    pub fn current_question_answered(&self) -> bool {
        self.responses
            .last()
            .is_some_and(|r| r.question_index == self.current_question_index)
    }

    /// Persistable form of this session.
    #[must_use]
    pub fn to_snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            quiz_id: self.key.quiz_id.clone(),
            participant: self.key.participant.clone(),
            run_id: self.run_id,
            current_question_index: self.current_question_index,
            path: self.path.clone(),
            responses: self.responses.clone(),
            result: self.result.clone(),
            session_id: self.remote_session_id.clone(),
            personalization: self.personalization.clone(),
            display_text: Some(self.display_text.clone()),
            analyzing: self.analyzing,
            definition_hash: self.definition_hash.clone(),
            touched_at: self.touched_at,
        }
    }

    /// Rebuilds a session from a snapshot taken against `quiz`.
    ///
    /// # Errors
    ///
    /// A response to the current question in a snapshot that is still
    /// answering belongs to an unfinished turn and is dropped.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the snapshot belongs to another
    /// quiz or definition, or its pointer and path do not fit the quiz.
    pub fn from_snapshot(
        quiz: &QuizDefinition,
        snapshot: SessionSnapshot,
    ) -> Result<Self, DomainError> {
        if snapshot.quiz_id != quiz.id {
            return Err(DomainError::Validation(format!(
                "snapshot belongs to quiz '{}'",
                snapshot.quiz_id
            )));
        }
        if snapshot.definition_hash != quiz.definition_hash {
            return Err(DomainError::Validation(
                "snapshot was taken against a different quiz definition".to_owned(),
            ));
        }
        let current = quiz.question(snapshot.current_question_index).ok_or_else(|| {
            DomainError::Validation(format!(
                "snapshot points at question {} but the quiz has {}",
                snapshot.current_question_index,
                quiz.total_steps()
            ))
        })?;
        if snapshot.path.last() != Some(&current.id)
            || snapshot.path.iter().any(|id| quiz.question_index(id).is_none())
        {
            return Err(DomainError::Validation(
                "snapshot path does not match the quiz".to_owned(),
            ));
        }

        let display_text = snapshot
            .display_text
            .unwrap_or_else(|| current.base_narrative().to_owned());

        // A turn cut off before the pointer moved is rolled back so the
        // current question can be answered again.
        let mut responses = snapshot.responses;
        let answering = !snapshot.analyzing && snapshot.result.is_none();
        if answering
            && responses
                .last()
                .is_some_and(|r| r.question_index == snapshot.current_question_index)
        {
            responses.pop();
        }

        Ok(Self {
            key: SessionKey::new(snapshot.participant, snapshot.quiz_id),
            run_id: snapshot.run_id,
            definition_hash: snapshot.definition_hash,
            current_question_index: snapshot.current_question_index,
            path: snapshot.path,
            responses,
            result: snapshot.result,
            remote_session_id: snapshot.session_id,
            personalization: snapshot.personalization,
            display_text,
            analyzing: snapshot.analyzing,
            touched_at: snapshot.touched_at,
        })
    }
}
