//! Queue dispatcher and workers.

use super::config::QueueConfig;
use super::handle::{JobHandle, JobStatus};
use super::job::GenerationJob;
use super::journal::JobJournal;
use crate::generate::transcode::Transcoder;
use crate::generate::{GenerationRequest, Generators, Origin};
use crate::orchestrator::{GenerationResult, Orchestrator};
use crate::provider::AsyncHttpClient;
use std::future::Future;
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs the generation behind a job.
pub trait JobRunner: Send + Sync + 'static {
    fn run(&self, job: &GenerationJob) -> impl Future<Output = GenerationResult> + Send;
}

impl<C, T> JobRunner for Generators<C, T>
where
    C: AsyncHttpClient + 'static,
    T: Transcoder + 'static,
{
    async fn run(&self, job: &GenerationJob) -> GenerationResult {
        self.generate(job.request(), job.key(), Origin::Queue).await
    }
}

/// Errors returned when submitting work.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Work queue is closed")]
    Closed,

    #[error("Failed to journal job: {0}")]
    Journal(#[from] io::Error),
}

/// A job in transit to the dispatcher.
struct QueuedJob {
    job: GenerationJob,
    status: watch::Sender<JobStatus>,
}

/// Submission side of the background work queue.
///
/// Cloneable. The dispatcher stops when the shutdown token is cancelled;
/// jobs that had not finished stay in the journal for the next start.
#[derive(Clone)]
pub struct WorkQueue {
    sender: mpsc::Sender<QueuedJob>,
    journal: Option<JobJournal>,
}

impl WorkQueue {
    /// Spawns the dispatcher and replays any journaled jobs.
    pub async fn start<R: JobRunner>(
        runner: Arc<R>,
        orchestrator: Orchestrator,
        config: QueueConfig,
        journal: Option<JobJournal>,
        shutdown: CancellationToken,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.capacity());
        let workers = config.workers();
        let worker = Worker {
            runner,
            orchestrator,
            journal: journal.clone(),
            config,
            shutdown,
        };
        tokio::spawn(dispatch(receiver, worker, workers));

        let queue = Self { sender, journal };
        queue.replay().await;
        queue
    }

    /// Accepts a generation request as a new job.
    pub async fn enqueue(&self, request: GenerationRequest) -> Result<JobHandle, QueueError> {
        self.enqueue_job(GenerationJob::new(request)).await
    }

    /// Journals `job` and hands it to the dispatcher.
    pub async fn enqueue_job(&self, job: GenerationJob) -> Result<JobHandle, QueueError> {
        if self.sender.is_closed() {
            return Err(QueueError::Closed);
        }
        if let Some(journal) = &self.journal {
            journal.record(&job).await?;
        }
        let id = job.id().clone();
        match self.submit(job).await {
            Ok(handle) => {
                debug!(job_id = %id, "Job enqueued");
                Ok(handle)
            }
            Err(e) => {
                if let Some(journal) = &self.journal {
                    let _ = journal.remove(&id).await;
                }
                Err(e)
            }
        }
    }

    /// Returns true once the dispatcher has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn submit(&self, job: GenerationJob) -> Result<JobHandle, QueueError> {
        let (status, status_rx) = watch::channel(JobStatus::Queued);
        let handle = JobHandle::new(job.id().clone(), status_rx);
        self.sender
            .send(QueuedJob { job, status })
            .await
            .map_err(|_| QueueError::Closed)?;
        Ok(handle)
    }

    async fn replay(&self) {
        let Some(journal) = &self.journal else {
            return;
        };
        let jobs = match journal.pending().await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(dir = %journal.dir().display(), error = %e, "Failed to read job journal");
                return;
            }
        };
        if jobs.is_empty() {
            return;
        }

        info!(count = jobs.len(), "Replaying journaled jobs");
        for job in jobs {
            let id = job.id().clone();
            if self.submit(job).await.is_err() {
                warn!(job_id = %id, "Queue closed during replay");
                return;
            }
        }
    }
}

/// Receives jobs and hands each to a worker slot.
async fn dispatch<R: JobRunner>(
    mut receiver: mpsc::Receiver<QueuedJob>,
    worker: Worker<R>,
    workers: usize,
) {
    let slots = Arc::new(Semaphore::new(workers));
    info!(workers, "Work queue started");

    loop {
        let queued = tokio::select! {
            biased;
            _ = worker.shutdown.cancelled() => break,
            next = receiver.recv() => match next {
                Some(queued) => queued,
                None => break,
            },
        };

        let permit = tokio::select! {
            biased;
            _ = worker.shutdown.cancelled() => break,
            permit = Arc::clone(&slots).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let worker = worker.clone();
        tokio::spawn(async move {
            let _permit = permit;
            worker.process(queued).await;
        });
    }

    info!("Work queue stopped");
}

struct Worker<R> {
    runner: Arc<R>,
    orchestrator: Orchestrator,
    journal: Option<JobJournal>,
    config: QueueConfig,
    shutdown: CancellationToken,
}

impl<R> Clone for Worker<R> {
    fn clone(&self) -> Self {
        Self {
            runner: Arc::clone(&self.runner),
            orchestrator: self.orchestrator.clone(),
            journal: self.journal.clone(),
            config: self.config.clone(),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<R: JobRunner> Worker<R> {
    async fn process(&self, queued: QueuedJob) {
        let QueuedJob { job, status } = queued;
        let key = job.key().clone();
        let class = job.class();

        if let Some(location) = self.orchestrator.store().locate(&key, class).await {
            debug!(job_id = %job.id(), key = %key, "Artifact already stored, job complete");
            self.finish(&job, &status, JobStatus::Completed(location))
                .await;
            return;
        }

        let mut retry = 0;
        loop {
            status.send_replace(JobStatus::Running);

            let runner = Arc::clone(&self.runner);
            let job_for_run = job.clone();
            let generate = move || {
                let runner = Arc::clone(&runner);
                let job = job_for_run.clone();
                async move { runner.run(&job).await }
            };

            match self
                .orchestrator
                .run_to_completion(&key, class, generate)
                .await
            {
                Ok(location) => {
                    info!(
                        job_id = %job.id(),
                        kind = %job.kind(),
                        key = %key,
                        retries = retry,
                        "Job completed"
                    );
                    self.finish(&job, &status, JobStatus::Completed(location))
                        .await;
                    return;
                }
                Err(e) if e.is_retryable() && retry < self.config.max_retries() => {
                    retry += 1;
                    let delay = self.config.retry_delay(retry);
                    warn!(
                        job_id = %job.id(),
                        key = %key,
                        attempt = retry,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Job failed, retrying"
                    );
                    status.send_replace(JobStatus::Retrying { attempt: retry });

                    tokio::select! {
                        _ = self.shutdown.cancelled() => {
                            info!(job_id = %job.id(), "Shutdown during retry backoff, job left in journal");
                            return;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => {
                    warn!(
                        job_id = %job.id(),
                        kind = %job.kind(),
                        key = %key,
                        retries = retry,
                        error = %e,
                        "Job abandoned"
                    );
                    self.finish(&job, &status, JobStatus::Abandoned(e)).await;
                    return;
                }
            }
        }
    }

    async fn finish(&self, job: &GenerationJob, status: &watch::Sender<JobStatus>, end: JobStatus) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.remove(job.id()).await {
                warn!(job_id = %job.id(), error = %e, "Failed to remove job record");
            }
        }
        status.send_replace(end);
    }
}
