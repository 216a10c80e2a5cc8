//! Quizflow — quiz catalog.
//!
//! Loads quiz definitions from YAML, fingerprints them, and validates the
//! branch graph and scoring tables once at load time so that configuration
//! errors never surface mid-run.

pub mod application;
pub mod domain;
