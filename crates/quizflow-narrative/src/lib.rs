//! Quizflow — narrative adaptation.
//!
//! Adapted text is display-only. Responses always record the question's
//! base text, so nothing produced here ever reaches scoring.

pub mod presenter;

pub use presenter::display_text;
