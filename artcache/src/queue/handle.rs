//! Job handle for status queries.
//!
//! The [`JobHandle`] is returned when a job is enqueued. It reports the
//! job's progress through a `watch` channel and can wait for a terminal
//! state.
//!
//! # Example
//!
//! ```ignore
//! let mut handle = queue.enqueue(request).await?;
//!
//! if handle.status().is_active() {
//!     println!("job {} still running", handle.id());
//! }
//!
//! let location = handle.wait().await?;
//! ```

use super::job::JobId;
use crate::error::ArtworkError;
use crate::store::ArtifactLocation;
use std::fmt;
use tokio::sync::watch;

/// Job execution status.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum JobStatus {
    /// Accepted, waiting for a worker.
    #[default]
    Queued,

    /// A worker is running the generation.
    Running,

    /// The previous attempt failed; waiting to retry. `attempt` counts retries.
    Retrying { attempt: u32 },

    /// The artifact is committed.
    Completed(ArtifactLocation),

    /// Retries exhausted or the failure is permanent. The key stays absent.
    Abandoned(ArtworkError),
}

impl JobStatus {
    /// Returns true for Completed and Abandoned.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Abandoned(_))
    }

    /// Returns true if the job has not reached a terminal state.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "Queued"),
            Self::Running => write!(f, "Running"),
            Self::Retrying { attempt } => write!(f, "Retrying (attempt {})", attempt),
            Self::Completed(_) => write!(f, "Completed"),
            Self::Abandoned(_) => write!(f, "Abandoned"),
        }
    }
}

/// Handle to an enqueued job.
///
/// Cloneable; every clone observes the same job.
#[derive(Clone)]
pub struct JobHandle {
    job_id: JobId,
    status_rx: watch::Receiver<JobStatus>,
}

impl JobHandle {
    pub(crate) fn new(job_id: JobId, status_rx: watch::Receiver<JobStatus>) -> Self {
        Self { job_id, status_rx }
    }

    pub fn id(&self) -> &JobId {
        &self.job_id
    }

    /// Returns the most recent status without waiting.
    pub fn status(&self) -> JobStatus {
        self.status_rx.borrow().clone()
    }

    /// Waits for a terminal state.
    ///
    /// If the queue shuts down before the job finishes, the job stays in the
    /// journal for replay and this returns a generation failure.
    pub async fn wait(&mut self) -> Result<ArtifactLocation, ArtworkError> {
        loop {
            match self.status() {
                JobStatus::Completed(location) => return Ok(location),
                JobStatus::Abandoned(error) => return Err(error),
                _ => {}
            }
            if self.status_rx.changed().await.is_err() {
                return match self.status() {
                    JobStatus::Completed(location) => Ok(location),
                    JobStatus::Abandoned(error) => Err(error),
                    _ => Err(ArtworkError::GenerationFailed(format!(
                        "queue stopped before job {} finished",
                        self.job_id
                    ))),
                };
            }
        }
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("job_id", &self.job_id)
            .field("status", &self.status())
            .finish()
    }
}
