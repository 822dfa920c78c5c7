//! Job identity, kinds and wire payloads.
//!
//! A job is one durable request to generate an artifact. Its payload is the
//! JSON document stored in the journal:
//!
//! ```text
//! {"type":"artwork:generate","payload":{"url":"…","key":"…","job_id":"…"}}
//! ```

use crate::generate::GenerationRequest;
use crate::key::CacheKey;
use crate::store::ArtifactClass;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a job.
///
/// # Example
///
/// ```
/// use artcache::queue::JobId;
///
/// let id = JobId::auto();
/// assert_eq!(id.as_str().len(), 36);
///
/// let named = JobId::new("replayed-1");
/// assert_eq!(named.to_string(), "replayed-1");
/// ```
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct JobId(String);

impl JobId {
    /// Creates a job ID with the given string value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a random (UUID v4) job ID.
    pub fn auto() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JobId({})", self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The kind of work a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    AnimatedClip,
    CompositeSquare,
    ResizedCopy,
}

impl JobKind {
    /// Task type name used on the wire and in logs.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::AnimatedClip => "artwork:generate",
            Self::CompositeSquare => "artwork:create_artist_square",
            Self::ResizedCopy => "artwork:create_icloud_art",
        }
    }

    pub fn class(&self) -> ArtifactClass {
        match self {
            Self::AnimatedClip => ArtifactClass::AnimatedClip,
            Self::CompositeSquare => ArtifactClass::CompositeSquare,
            Self::ResizedCopy => ArtifactClass::ResizedCopy,
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Serialized form of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum JobPayload {
    #[serde(rename = "artwork:generate")]
    Generate {
        url: String,
        key: String,
        job_id: String,
    },
    #[serde(rename = "artwork:create_artist_square")]
    ArtistSquare {
        image_urls: Vec<String>,
        key: String,
        job_id: String,
    },
    #[serde(rename = "artwork:create_icloud_art")]
    ICloudArt {
        image_url: String,
        key: String,
        job_id: String,
    },
}

/// A payload that cannot be turned back into a job.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobDecodeError {
    #[error("Job {job_id} has an invalid cache key: {key:?}")]
    InvalidKey { job_id: String, key: String },
}

/// One queued generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationJob {
    id: JobId,
    key: CacheKey,
    request: GenerationRequest,
}

impl GenerationJob {
    /// Creates a job with a fresh id, keyed from the request's URLs.
    pub fn new(request: GenerationRequest) -> Self {
        Self {
            id: JobId::auto(),
            key: request.key(),
            request,
        }
    }

    pub fn with_id(mut self, id: JobId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }

    pub fn kind(&self) -> JobKind {
        match self.request {
            GenerationRequest::AnimatedClip { .. } => JobKind::AnimatedClip,
            GenerationRequest::CompositeSquare { .. } => JobKind::CompositeSquare,
            GenerationRequest::ResizedCopy { .. } => JobKind::ResizedCopy,
        }
    }

    pub fn class(&self) -> ArtifactClass {
        self.kind().class()
    }

    pub fn to_payload(&self) -> JobPayload {
        let key = self.key.to_string();
        let job_id = self.id.to_string();
        match &self.request {
            GenerationRequest::AnimatedClip { manifest_url } => JobPayload::Generate {
                url: manifest_url.clone(),
                key,
                job_id,
            },
            GenerationRequest::CompositeSquare { image_urls } => JobPayload::ArtistSquare {
                image_urls: image_urls.clone(),
                key,
                job_id,
            },
            GenerationRequest::ResizedCopy { image_url } => JobPayload::ICloudArt {
                image_url: image_url.clone(),
                key,
                job_id,
            },
        }
    }

    pub fn from_payload(payload: JobPayload) -> Result<Self, JobDecodeError> {
        let (request, key, job_id) = match payload {
            JobPayload::Generate { url, key, job_id } => (
                GenerationRequest::AnimatedClip { manifest_url: url },
                key,
                job_id,
            ),
            JobPayload::ArtistSquare {
                image_urls,
                key,
                job_id,
            } => (
                GenerationRequest::CompositeSquare { image_urls },
                key,
                job_id,
            ),
            JobPayload::ICloudArt {
                image_url,
                key,
                job_id,
            } => (GenerationRequest::ResizedCopy { image_url }, key, job_id),
        };

        let key = CacheKey::parse(&key).ok_or(JobDecodeError::InvalidKey {
            job_id: job_id.clone(),
            key,
        })?;

        Ok(Self {
            id: JobId::new(job_id),
            key,
            request,
        })
    }
}
