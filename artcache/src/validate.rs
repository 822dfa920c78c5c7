//! Input validation for generation requests.
//!
//! Source URLs must be http(s) and hosted under one of the allowed domain
//! suffixes. Composite requests must name between two and four images.

use crate::error::ArtworkError;
use crate::generate::GenerationRequest;
use reqwest::Url;

/// Domain suffixes accepted by default.
pub const DEFAULT_ALLOWED_DOMAINS: [&str; 2] = [".apple.com", ".mzstatic.com"];

/// Fewest images a composite square accepts.
pub const MIN_COMPOSITE_IMAGES: usize = 2;

/// Most images a composite square accepts.
pub const MAX_COMPOSITE_IMAGES: usize = 4;

/// Checks source URLs against a domain allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlValidator {
    suffixes: Vec<String>,
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_DOMAINS)
    }
}

impl UrlValidator {
    /// Creates a validator for the given host suffixes.
    ///
    /// A suffix without a leading dot gets one, so `apple.com` only matches
    /// subdomains, never `evilapple.com`.
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffixes = suffixes
            .into_iter()
            .map(|s| s.as_ref().trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .map(|s| if s.starts_with('.') { s } else { format!(".{}", s) })
            .collect();
        Self { suffixes }
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    /// Validates one URL, returning the parsed form.
    ///
    /// # Example
    ///
    /// ```
    /// use artcache::validate::UrlValidator;
    ///
    /// let validator = UrlValidator::default();
    /// assert!(validator.validate("https://is1-ssl.mzstatic.com/a.jpg").is_ok());
    /// assert!(validator.validate("https://example.com/a.jpg").is_err());
    /// ```
    pub fn validate(&self, raw: &str) -> Result<Url, ArtworkError> {
        let url = Url::parse(raw).map_err(|_| ArtworkError::Validation("invalid URL".into()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ArtworkError::Validation(format!(
                "unsupported URL scheme: {}",
                url.scheme()
            )));
        }

        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        if !self.suffixes.iter().any(|s| host.ends_with(s.as_str())) {
            return Err(ArtworkError::Validation(self.domain_message()));
        }

        Ok(url)
    }

    /// Validates every URL a request references, plus its image count.
    pub fn validate_request(&self, request: &GenerationRequest) -> Result<(), ArtworkError> {
        match request {
            GenerationRequest::AnimatedClip { manifest_url } => {
                if manifest_url.is_empty() {
                    return Err(ArtworkError::Validation(
                        "URL query parameter is required".into(),
                    ));
                }
                self.validate(manifest_url)?;
            }
            GenerationRequest::CompositeSquare { image_urls } => {
                validate_composite_count(image_urls.len())?;
                for url in image_urls {
                    if let Err(ArtworkError::Validation(reason)) = self.validate(url) {
                        return Err(ArtworkError::Validation(format!(
                            "Invalid URL: {}. {}",
                            url, reason
                        )));
                    }
                }
            }
            GenerationRequest::ResizedCopy { image_url } => {
                if image_url.is_empty() {
                    return Err(ArtworkError::Validation("imageUrl is required".into()));
                }
                self.validate(image_url)?;
            }
        }
        Ok(())
    }

    fn domain_message(&self) -> String {
        let domains: Vec<String> = self.suffixes.iter().map(|s| format!("*{}", s)).collect();
        format!("URL must be from {} domain", domains.join(" or "))
    }
}

/// Checks a composite image count.
pub fn validate_composite_count(count: usize) -> Result<(), ArtworkError> {
    if (MIN_COMPOSITE_IMAGES..=MAX_COMPOSITE_IMAGES).contains(&count) {
        Ok(())
    } else {
        Err(ArtworkError::Validation(format!(
            "imageUrls must contain between {} and {} URLs, got {}",
            MIN_COMPOSITE_IMAGES, MAX_COMPOSITE_IMAGES, count
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(result: Result<impl std::fmt::Debug, ArtworkError>) -> String {
        match result {
            Err(ArtworkError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_accepts_allowed_subdomains() {
        let v = UrlValidator::default();
        assert!(v.validate("https://video-ssl.itunes.apple.com/a/master.m3u8").is_ok());
        assert!(v.validate("http://is3-ssl.mzstatic.com/image/x.jpg").is_ok());
        assert!(v.validate("https://IS1.MZSTATIC.COM/x.jpg").is_ok());
    }

    #[test]
    fn test_rejects_foreign_and_lookalike_hosts() {
        let v = UrlValidator::default();
        assert_eq!(
            message(v.validate("https://example.com/a.jpg")),
            "URL must be from *.apple.com or *.mzstatic.com domain"
        );
        assert!(v.validate("https://evilapple.com/a.jpg").is_err());
        assert!(v.validate("https://apple.com.evil.net/a.jpg").is_err());
    }

    #[test]
    fn test_rejects_bad_scheme_and_garbage() {
        let v = UrlValidator::default();
        assert!(message(v.validate("ftp://a.apple.com/x")).contains("scheme"));
        assert_eq!(message(v.validate("not a url")), "invalid URL");
    }

    #[test]
    fn test_custom_suffixes_are_normalized() {
        let v = UrlValidator::new(["example.org", " .Test.Net "]);
        assert_eq!(v.suffixes(), &[".example.org".to_string(), ".test.net".to_string()]);
        assert!(v.validate("https://cdn.example.org/a.png").is_ok());
        assert!(v.validate("https://a.apple.com/a.png").is_err());
    }

    #[test]
    fn test_composite_count_bounds() {
        assert!(validate_composite_count(1).is_err());
        assert!(validate_composite_count(2).is_ok());
        assert!(validate_composite_count(4).is_ok());
        assert!(validate_composite_count(5).is_err());
    }

    #[test]
    fn test_request_validation_names_offending_url() {
        let v = UrlValidator::default();
        let request = GenerationRequest::CompositeSquare {
            image_urls: vec![
                "https://is1.mzstatic.com/a.jpg".into(),
                "https://example.com/b.jpg".into(),
            ],
        };
        assert_eq!(
            message(v.validate_request(&request)),
            "Invalid URL: https://example.com/b.jpg. URL must be from *.apple.com or *.mzstatic.com domain"
        );
    }

    #[test]
    fn test_missing_clip_url() {
        let v = UrlValidator::default();
        let request = GenerationRequest::AnimatedClip {
            manifest_url: String::new(),
        };
        assert_eq!(
            message(v.validate_request(&request)),
            "URL query parameter is required"
        );
    }
}
