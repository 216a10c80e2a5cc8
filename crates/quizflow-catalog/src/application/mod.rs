//! Application layer for the quiz catalog.

pub mod catalog;
