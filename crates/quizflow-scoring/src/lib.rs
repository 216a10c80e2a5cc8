//! Quizflow — result scoring.
//!
//! Two strategies, chosen by the quiz's `QuizKind` and never mixed: local
//! rule-table accumulation, and selection delegated to the external
//! reasoning service over a closed word vocabulary.

pub mod application;
pub mod domain;

pub use application::scorer::{ScoringContext, compute_result};
