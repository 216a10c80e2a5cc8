//! Quizflow Core — shared domain model and collaborator contracts.
//!
//! This crate defines the quiz definition model, responses and results,
//! the session snapshot and store contract, and the traits for every
//! external collaborator the engine talks to. It contains no
//! infrastructure code.

pub mod clock;
pub mod error;
pub mod gateway;
pub mod quiz;
pub mod response;
pub mod store;
