use std::time::Duration;

/// Configuration for the orchestrator.
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Overall ceiling for one request; elapsed, it cancels every operation still running.
    ///
    /// Must be non-zero.
    pub ceiling: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            ceiling: Duration::from_secs(5),
        }
    }
}
