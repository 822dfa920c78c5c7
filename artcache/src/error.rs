//! Error taxonomy for artifact generation.
//!
//! Every stage of a generation run (validation, fetch, decode, rendition
//! selection, transcoding, commit) reports through [`ArtworkError`]. The
//! orchestrator broadcasts results to coalesced waiters, so the error is
//! `Clone` and carries owned strings rather than source errors.

use thiserror::Error;

/// Errors produced while validating, generating or committing an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtworkError {
    /// Bad or disallowed input (URL outside the allow-list, wrong URL count)
    #[error("Invalid request: {0}")]
    Validation(String),

    /// A manifest or image could not be retrieved
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Image bytes could not be decoded by any decoder in the chain
    #[error("Failed to decode image from {url}")]
    Decode { url: String },

    /// No rendition in the manifest satisfied the selection policy
    #[error("No suitable stream found in manifest {url}")]
    NoSuitableRendition { url: String },

    /// The external transcoder failed or produced nothing
    #[error("Transcode failed: {0}")]
    Transcode(String),

    /// Commit-time failure (zero-byte output, rename failure, encode failure)
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// Composite requested with an image count that has no layout
    #[error("Unsupported number of images: {0}")]
    UnsupportedLayout(usize),
}

impl ArtworkError {
    /// Creates a fetch error for the given URL.
    pub fn fetch(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if a later attempt could plausibly succeed.
    ///
    /// Transport failures and transcoder/commit failures are retried by the
    /// background queue; bad input and undecodable content are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Fetch { .. } | Self::Transcode(_) | Self::GenerationFailed(_)
        )
    }

    /// Returns true if this error should be reported to the client as a 4xx.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
