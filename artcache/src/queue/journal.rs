//! Durable job journal.
//!
//! Every accepted job is written to `{dir}/{job_id}.json` before it is
//! handed to a worker and removed once the job completes or is abandoned.
//! Whatever is left at startup was interrupted and gets replayed.

use super::job::{GenerationJob, JobId, JobPayload};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory name of the journal under the cache root.
pub const JOURNAL_DIR_NAME: &str = "jobs";

const RECORD_EXTENSION: &str = "json";
const PARTIAL_EXTENSION: &str = "partial";

/// File-per-job journal.
#[derive(Debug, Clone)]
pub struct JobJournal {
    dir: PathBuf,
}

impl JobJournal {
    /// Opens (creating if needed) a journal in `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Opens the journal that lives under a cache root.
    pub fn under_root(root: &Path) -> io::Result<Self> {
        Self::open(root.join(JOURNAL_DIR_NAME))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &JobId) -> PathBuf {
        self.dir.join(format!("{}.{}", id, RECORD_EXTENSION))
    }

    /// Persists a job. The record appears atomically.
    pub async fn record(&self, job: &GenerationJob) -> io::Result<()> {
        let bytes = serde_json::to_vec(&job.to_payload()).map_err(io::Error::other)?;
        let final_path = self.record_path(job.id());
        let partial = final_path.with_extension(PARTIAL_EXTENSION);

        tokio::fs::write(&partial, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&partial, &final_path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }
        debug!(job_id = %job.id(), "Job recorded");
        Ok(())
    }

    /// Removes a job's record. A missing record is not an error.
    pub async fn remove(&self, id: &JobId) -> io::Result<()> {
        match tokio::fs::remove_file(self.record_path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Loads every pending job.
    ///
    /// Unreadable or malformed records are logged and skipped; they stay on
    /// disk for inspection.
    pub async fn pending(&self) -> io::Result<Vec<GenerationJob>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut jobs = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            match load_record(&path).await {
                Ok(job) => jobs.push(job),
                Err(reason) => {
                    warn!(path = %path.display(), reason = %reason, "Skipping unreadable job record")
                }
            }
        }

        Ok(jobs)
    }
}

async fn load_record(path: &Path) -> Result<GenerationJob, String> {
    let bytes = tokio::fs::read(path).await.map_err(|e| e.to_string())?;
    let payload: JobPayload = serde_json::from_slice(&bytes).map_err(|e| e.to_string())?;
    GenerationJob::from_payload(payload).map_err(|e| e.to_string())
}
