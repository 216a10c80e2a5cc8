//! Domain layer for the quiz catalog.

pub mod validation;
