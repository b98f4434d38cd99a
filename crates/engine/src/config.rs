//! Tuning knobs for the engine.

use std::time::Duration;

/// Engine-wide configuration.
///
/// The CLI fills this from flags / environment variables; tests usually start
/// from [`EngineConfig::default`] and shorten the timeout.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on a single action handler call. Expiry counts as a failure.
    pub action_timeout: Duration,
    /// Number of tasks draining the event queue in parallel.
    pub workers: usize,
    /// Events buffered before `submit` applies back-pressure.
    pub queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            action_timeout: Duration::from_secs(10),
            workers: 4,
            queue_capacity: 256,
        }
    }
}

impl EngineConfig {
    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }
}
