//! Pure scoring logic.

pub mod mediated;
pub mod rule_table;
