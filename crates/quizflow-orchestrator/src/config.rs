//! Engine configuration.

use std::time::Duration;

/// Default per-call timeout for external collaborators.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Tunables shared by every orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on any single awaited collaborator call.
    pub call_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}
