//! Route modules.

pub mod health;
pub mod quizzes;
pub mod runs;
