//! Quizflow — HTTP collaborator gateway.
//!
//! One client implementing every collaborator contract against the remote
//! service. Status handling lives in `http`; `client` only maps requests to
//! endpoints.

pub mod client;
mod http;

pub use client::{GatewayConfig, HttpGateway};
