//! Scoring entry point that dispatches on quiz kind and calls the
//! reasoning service.

pub mod scorer;
