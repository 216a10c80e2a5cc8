//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No quiz definition is registered under the identifier.
    #[error("quiz not found: {0}")]
    QuizNotFound(String),

    /// Participant input was rejected (unknown option, missing field).
    #[error("validation error: {0}")]
    Validation(String),

    /// A quiz definition failed load-time validation.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The requested operation is not allowed from the current screen.
    #[error("cannot {operation} while on the {screen} screen")]
    InvalidTransition {
        /// The screen the orchestrator was showing.
        screen: &'static str,
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// Result computation failed and no safe fallback exists.
    #[error("analysis failed: {0}")]
    Analysis(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
