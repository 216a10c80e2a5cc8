//! Quizflow — orchestration.
//!
//! One `Orchestrator` per participant and quiz. It owns the in-memory
//! session, decides which screen is showing, and runs the per-answer
//! pipeline: persist, report progress, resolve the branch, then adapt the
//! next question or score the run.

pub mod collaborators;
pub mod config;
pub mod engine;
pub mod screen;

pub use collaborators::Collaborators;
pub use config::EngineConfig;
pub use engine::{Orchestrator, SubmitOutcome};
pub use screen::Screen;
