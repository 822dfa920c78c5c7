//! Orchestrator configuration.

use std::time::Duration;

/// Default time a caller waits for a generation before getting `Pending`.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of generation attempts on the request path.
pub const DEFAULT_SYNC_ATTEMPTS: u32 = 1;

/// Default base delay between request-path attempts.
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default bound on concurrent generations across all keys.
pub const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Tuning for the generation orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    wait_timeout: Duration,
    sync_attempts: u32,
    retry_base_delay: Duration,
    max_concurrent: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            sync_attempts: DEFAULT_SYNC_ATTEMPTS,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Sets the attempt count; zero is treated as one.
    pub fn with_sync_attempts(mut self, attempts: u32) -> Self {
        self.sync_attempts = attempts.max(1);
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Sets the concurrent generation bound; zero is treated as one.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    pub fn sync_attempts(&self) -> u32 {
        self.sync_attempts
    }

    pub fn retry_base_delay(&self) -> Duration {
        self.retry_base_delay
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.wait_timeout(), Duration::from_secs(30));
        assert_eq!(config.sync_attempts(), 1);
        assert_eq!(config.max_concurrent(), 8);
    }

    #[test]
    fn test_zero_values_are_clamped() {
        let config = OrchestratorConfig::new()
            .with_sync_attempts(0)
            .with_max_concurrent(0);
        assert_eq!(config.sync_attempts(), 1);
        assert_eq!(config.max_concurrent(), 1);
    }
}
