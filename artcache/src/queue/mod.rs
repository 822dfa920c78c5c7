//! Background work queue.
//!
//! Generation requests can be handed to a durable queue instead of being
//! run on the request path. The queue:
//!
//! - journals every accepted job before dispatching it
//! - bounds concurrency with a fixed pool of worker slots
//! - routes each job through the orchestrator's in-flight map, so duplicate
//!   jobs for one key converge on a single generation
//! - retries retryable failures with exponential backoff, then abandons
//!
//! ```text
//! enqueue ──► journal ──► mpsc ──► dispatcher ──► worker slot ──► Orchestrator
//!                                        (Semaphore)                 │
//!   JobHandle ◄────────── watch<JobStatus> ◄─────────────────────────┘
//! ```

mod config;
mod handle;
mod job;
mod journal;
mod worker;

pub use config::{
    QueueConfig, DEFAULT_MAX_RETRIES, DEFAULT_QUEUE_CAPACITY, DEFAULT_QUEUE_RETRY_BASE_DELAY,
    DEFAULT_WORKERS, MAX_WORKERS, MIN_WORKERS,
};
pub use handle::{JobHandle, JobStatus};
pub use job::{GenerationJob, JobDecodeError, JobId, JobKind, JobPayload};
pub use journal::{JobJournal, JOURNAL_DIR_NAME};
pub use worker::{JobRunner, QueueError, WorkQueue};
