//! Shared test doubles for the Quizflow engine.

mod clock;
mod collaborators;
mod quiz;
mod store;

pub use clock::{FixedClock, ManualClock};
pub use collaborators::ScriptedCollaborators;
pub use quiz::{linear_quiz, mediated_quiz, rule_table_quiz};
pub use store::{FailingSessionStore, InMemorySessionStore};
