//! Quizflow — branch resolution.
//!
//! Picks the next question from an answer: an explicit branch target on the
//! chosen option wins; free text may be routed by the external classifier;
//! otherwise the first unvisited question after the current one is used.

pub mod resolver;

pub use resolver::{BranchDecision, BranchVia, Selection, resolve_next};
