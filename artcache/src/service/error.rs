//! Errors raised while bringing the artwork service up.
//!
//! Request-time failures never surface here: they become an
//! [`ArtworkResponse`](super::ArtworkResponse) instead.

use crate::provider::ProviderError;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Startup failures of [`ArtworkService`](super::ArtworkService).
#[derive(Debug)]
pub enum ServiceError {
    /// The outbound HTTP client could not be built
    HttpClient(ProviderError),
    /// A cache or journal directory could not be prepared
    CacheDirectory { path: PathBuf, source: io::Error },
}

impl ServiceError {
    pub(crate) fn cache_directory(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::CacheDirectory {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpClient(e) => write!(f, "cannot build HTTP client: {}", e),
            Self::CacheDirectory { path, source } => {
                write!(f, "cannot prepare {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::HttpClient(e) => Some(e),
            Self::CacheDirectory { source, .. } => Some(source),
        }
    }
}

impl From<ProviderError> for ServiceError {
    fn from(e: ProviderError) -> Self {
        Self::HttpClient(e)
    }
}
