//! Request-level responses and their wording.

use crate::error::ArtworkError;
use crate::key::CacheKey;
use crate::store::{ArtifactClass, ArtifactLocation};

/// User-facing wording for one artifact class.
#[derive(Debug)]
pub struct ClassMessages {
    pub exists: &'static str,
    pub generated: &'static str,
    pub pending: &'static str,
    pub failed: &'static str,
    pub timed_out: &'static str,
    pub not_found: &'static str,
}

const CLIP_MESSAGES: ClassMessages = ClassMessages {
    exists: "GIF already exists",
    generated: "GIF has been generated",
    pending: "GIF is still being processed. Please check back later.",
    failed: "Failed to generate artwork",
    timed_out: "GIF generation timed out",
    not_found: "GIF not found",
};

const SQUARE_MESSAGES: ClassMessages = ClassMessages {
    exists: "Artist square already exists",
    generated: "Artist square has been generated",
    pending: "Artist square is still being processed. Please check back later.",
    failed: "Failed to generate artist square",
    timed_out: "Artist square generation timed out",
    not_found: "Artist Square not found",
};

const RESIZED_MESSAGES: ClassMessages = ClassMessages {
    exists: "iCloud art already exists",
    generated: "iCloud art has been generated",
    pending: "iCloud art is still being processed. Please check back later.",
    failed: "Failed to generate iCloud art",
    timed_out: "iCloud art generation timed out",
    not_found: "iCloud Art not found",
};

/// Returns the wording for `class`.
pub fn messages(class: ArtifactClass) -> &'static ClassMessages {
    match class {
        ArtifactClass::AnimatedClip => &CLIP_MESSAGES,
        ArtifactClass::CompositeSquare => &SQUARE_MESSAGES,
        ArtifactClass::ResizedCopy => &RESIZED_MESSAGES,
    }
}

/// Builds the public link for an artifact.
///
/// `extension` is omitted from resized-copy links while the format is
/// still unknown.
///
/// ```
/// use artcache::key::derive_key;
/// use artcache::service::public_url;
/// use artcache::store::ArtifactClass;
///
/// let key = derive_key("hello");
/// assert_eq!(
///     public_url("https://art.cider.sh", ArtifactClass::CompositeSquare, &key, Some("jpg")),
///     "https://art.cider.sh/artwork/artist-square/5d41402abc4b2a76b9719d911017c592.jpg"
/// );
/// ```
pub fn public_url(
    base: &str,
    class: ArtifactClass,
    key: &CacheKey,
    extension: Option<&str>,
) -> String {
    let base = base.trim_end_matches('/');
    let prefix = match class {
        ArtifactClass::AnimatedClip => "artwork",
        ArtifactClass::CompositeSquare => "artwork/artist-square",
        ArtifactClass::ResizedCopy => "artwork/icloud",
    };
    match extension {
        Some(ext) => format!("{}/{}/{}.{}", base, prefix, key, ext),
        None => format!("{}/{}/{}", base, prefix, key),
    }
}

/// Outcome of a generation request, ready to be rendered by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtworkResponse {
    /// The artifact is in the store.
    Ready {
        key: CacheKey,
        location: ArtifactLocation,
        message: &'static str,
        url: String,
        cached: bool,
    },
    /// Generation continues in the background.
    Pending {
        key: CacheKey,
        message: &'static str,
        url: String,
    },
    /// The request was rejected before any work.
    Invalid { message: String },
    /// Generation failed. `error` is for logs; `message` is for clients.
    Failed {
        key: CacheKey,
        message: &'static str,
        error: ArtworkError,
    },
    /// The wait expired and the deployment reports that as an error.
    TimedOut {
        key: CacheKey,
        message: &'static str,
    },
}

impl ArtworkResponse {
    /// HTTP status code for this response.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Ready { .. } => 200,
            Self::Pending { .. } => 202,
            Self::Invalid { .. } => 400,
            Self::Failed { .. } | Self::TimedOut { .. } => 500,
        }
    }

    pub fn key(&self) -> Option<&CacheKey> {
        match self {
            Self::Ready { key, .. }
            | Self::Pending { key, .. }
            | Self::Failed { key, .. }
            | Self::TimedOut { key, .. } => Some(key),
            Self::Invalid { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Ready { message, .. }
            | Self::Pending { message, .. }
            | Self::Failed { message, .. }
            | Self::TimedOut { message, .. } => message,
            Self::Invalid { message } => message,
        }
    }

    /// Public link, for successful and pending responses.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Ready { url, .. } | Self::Pending { url, .. } => Some(url),
            _ => None,
        }
    }

    /// Returns true if the response should be rendered as an error body.
    pub fn is_error(&self) -> bool {
        self.url().is_none()
    }
}
