//! Application services for sessions.

pub mod cache;
pub mod progress;
