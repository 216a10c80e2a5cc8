//! Domain layer for sessions.

pub mod session;
