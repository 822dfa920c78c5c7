//! Provider types shared by the HTTP client and the downloader.

use std::fmt;

/// Errors that can occur while fetching remote sources.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Transport-level failure (connect, timeout, TLS, body read)
    HttpError(String),
    /// Server answered with a non-success status
    Status { url: String, status: u16 },
    /// Response body exceeded the configured cap
    BodyTooLarge { url: String, limit: usize },
    /// Invalid response data from the remote
    InvalidResponse(String),
}

impl ProviderError {
    /// Returns true for failures worth another attempt.
    ///
    /// Transport errors and 5xx/429 statuses are transient; everything else
    /// would fail identically on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::HttpError(_) => true,
            ProviderError::Status { status, .. } => *status >= 500 || *status == 429,
            ProviderError::BodyTooLarge { .. } | ProviderError::InvalidResponse(_) => false,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::HttpError(msg) => write!(f, "HTTP error: {}", msg),
            ProviderError::Status { url, status } => write!(f, "HTTP {} from {}", status, url),
            ProviderError::BodyTooLarge { url, limit } => {
                write!(f, "Response from {} exceeds {} bytes", url, limit)
            }
            ProviderError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

/// A successful HTTP response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HttpResponse {
    /// Value of the `Content-Type` header, if the server sent one
    pub content_type: Option<String>,
    /// Response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response with the given content type and body.
    pub fn new(content_type: Option<&str>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: content_type.map(str::to_string),
            body: body.into(),
        }
    }

    /// Returns the body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::HttpError("reset".into()).is_transient());
        assert!(ProviderError::Status {
            url: "u".into(),
            status: 503
        }
        .is_transient());
        assert!(ProviderError::Status {
            url: "u".into(),
            status: 429
        }
        .is_transient());
        assert!(!ProviderError::Status {
            url: "u".into(),
            status: 404
        }
        .is_transient());
        assert!(!ProviderError::BodyTooLarge {
            url: "u".into(),
            limit: 1
        }
        .is_transient());
    }

    #[test]
    fn test_status_display() {
        let err = ProviderError::Status {
            url: "https://a.apple.com/m.m3u8".into(),
            status: 404,
        };
        assert_eq!(err.to_string(), "HTTP 404 from https://a.apple.com/m.m3u8");
    }

    #[test]
    fn test_response_text_is_lossy() {
        let resp = HttpResponse::new(None, vec![b'o', b'k', 0xff]);
        assert_eq!(resp.text(), "ok\u{fffd}");
    }
}
