//! Work queue configuration.

use std::time::Duration;

/// Default number of concurrent queue workers.
pub const DEFAULT_WORKERS: usize = 5;

/// Minimum number of workers.
pub const MIN_WORKERS: usize = 3;

/// Maximum number of workers.
pub const MAX_WORKERS: usize = 10;

/// Default number of retries after the first failed attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for retry backoff.
pub const DEFAULT_QUEUE_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default capacity of the submission channel.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Configuration for the background work queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    workers: usize,
    max_retries: u32,
    retry_base_delay: Duration,
    capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_QUEUE_RETRY_BASE_DELAY,
            capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl QueueConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the worker count, clamped to `MIN_WORKERS..=MAX_WORKERS`.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.clamp(MIN_WORKERS, MAX_WORKERS);
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn retry_base_delay(&self) -> Duration {
        self.retry_base_delay
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Backoff before retry number `retry` (1-based).
    pub fn retry_delay(&self, retry: u32) -> Duration {
        self.retry_base_delay
            .saturating_mul(1 << retry.saturating_sub(1).min(16))
    }
}
