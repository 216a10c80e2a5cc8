//! Quizflow — session state and persistence.
//!
//! Responsible for the resumable session value, the freshness-checked
//! session cache, and best-effort progress reporting to the remote log.

pub mod application;
pub mod domain;
