//! Retrying source downloads.
//!
//! Image sources are fetched with a small number of attempts and exponential
//! backoff. When the server omits `Content-Type`, a HEAD request fills it in
//! so the decoder chain can still start from the declared type.

use super::http::AsyncHttpClient;
use super::types::ProviderError;
use crate::error::ArtworkError;
use std::time::Duration;
use tracing::{debug, warn};

/// Default number of download attempts.
pub const DEFAULT_DOWNLOAD_ATTEMPTS: u32 = 3;

/// Default delay before the second attempt; doubles on each further attempt.
pub const DEFAULT_DOWNLOAD_BASE_DELAY: Duration = Duration::from_secs(1);

/// Retry settings for [`Downloader`].
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_DOWNLOAD_ATTEMPTS,
            base_delay: DEFAULT_DOWNLOAD_BASE_DELAY,
        }
    }
}

impl DownloadConfig {
    /// Sets the number of attempts (at least one).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the first backoff delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Backoff after failed attempt number `attempt` (0-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1 << attempt.min(16))
    }
}

/// A fetched source, ready for decoding.
#[derive(Debug, Clone)]
pub struct Download {
    /// The URL the bytes came from
    pub url: String,
    /// Declared content type, from GET or a follow-up HEAD
    pub content_type: Option<String>,
    /// Raw bytes
    pub body: Vec<u8>,
}

/// Fetches sources through an [`AsyncHttpClient`] with retry.
pub struct Downloader<C> {
    client: C,
    config: DownloadConfig,
}

impl<C: AsyncHttpClient> Downloader<C> {
    /// Creates a downloader.
    pub fn new(client: C, config: DownloadConfig) -> Self {
        Self { client, config }
    }

    /// Returns the underlying HTTP client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Downloads an image source.
    ///
    /// Transient failures are retried with exponential backoff. An empty
    /// body is a fetch failure.
    pub async fn fetch(&self, url: &str) -> Result<Download, ArtworkError> {
        let mut attempt = 0;
        let response = loop {
            match self.client.get(url).await {
                Ok(response) => break response,
                Err(e) if e.is_transient() && attempt + 1 < self.config.max_attempts => {
                    let delay = self.config.retry_delay(attempt);
                    warn!(
                        url = url,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Download failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(ArtworkError::fetch(
                        url,
                        format!("{} (after {} attempts)", e, attempt + 1),
                    ))
                }
            }
        };

        if response.body.is_empty() {
            return Err(ArtworkError::fetch(url, "downloaded image data is empty"));
        }

        let content_type = match response.content_type {
            Some(ct) => Some(ct),
            None => {
                debug!(url = url, "No content type on GET, issuing HEAD");
                self.client
                    .head_content_type(url)
                    .await
                    .map_err(|e: ProviderError| {
                        ArtworkError::fetch(url, format!("failed to get content type: {}", e))
                    })?
            }
        };

        Ok(Download {
            url: url.to_string(),
            content_type,
            body: response.body,
        })
    }

    /// Fetches a text document (a manifest) with a single attempt.
    pub async fn fetch_text(&self, url: &str) -> Result<String, ArtworkError> {
        self.client
            .get(url)
            .await
            .map(|r| r.text())
            .map_err(|e| ArtworkError::fetch(url, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::http::tests::MockAsyncHttpClient;
    use crate::provider::types::HttpResponse;

    const URL: &str = "https://is1-ssl.mzstatic.com/image/a.jpg";

    fn downloader(client: MockAsyncHttpClient) -> Downloader<MockAsyncHttpClient> {
        Downloader::new(client, DownloadConfig::default())
    }

    #[test]
    fn test_retry_delay_doubles_and_saturates() {
        let config = DownloadConfig::default().with_base_delay(Duration::from_millis(100));
        assert_eq!(config.retry_delay(0), Duration::from_millis(100));
        assert_eq!(config.retry_delay(2), Duration::from_millis(400));
        assert_eq!(config.retry_delay(40), config.retry_delay(16));

        let huge = DownloadConfig::default().with_base_delay(Duration::MAX);
        assert_eq!(huge.retry_delay(5), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_many_attempts_do_not_overflow_backoff() {
        let client = MockAsyncHttpClient::new()
            .with_sequence(URL, vec![Err(ProviderError::HttpError("reset".into()))]);
        let dl = Downloader::new(
            client.clone(),
            DownloadConfig::default()
                .with_max_attempts(40)
                .with_base_delay(Duration::from_millis(1)),
        );

        assert!(dl.fetch(URL).await.is_err());
        assert_eq!(client.get_count(), 40);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_failures() {
        let client = MockAsyncHttpClient::new().with_sequence(
            URL,
            vec![
                Err(ProviderError::HttpError("reset".into())),
                Err(ProviderError::HttpError("reset".into())),
                Ok(HttpResponse::new(Some("image/jpeg"), vec![1, 2, 3])),
            ],
        );
        let dl = downloader(client.clone());

        let download = dl.fetch(URL).await.unwrap();
        assert_eq!(download.body, vec![1, 2, 3]);
        assert_eq!(client.get_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let client = MockAsyncHttpClient::new()
            .with_sequence(URL, vec![Err(ProviderError::HttpError("reset".into()))]);
        let dl = downloader(client.clone());

        let err = dl.fetch(URL).await.unwrap_err();
        assert!(matches!(err, ArtworkError::Fetch { .. }));
        assert_eq!(client.get_count(), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_not_found() {
        let client = MockAsyncHttpClient::new();
        let dl = downloader(client.clone());

        assert!(dl.fetch(URL).await.is_err());
        assert_eq!(client.get_count(), 1);
    }

    #[tokio::test]
    async fn test_head_fills_missing_content_type() {
        let client = MockAsyncHttpClient::new()
            .with_response(URL, None, vec![7])
            .with_head(URL, "image/png");
        let dl = downloader(client.clone());

        let download = dl.fetch(URL).await.unwrap();
        assert_eq!(download.content_type.as_deref(), Some("image/png"));
        assert_eq!(client.head_count(), 1);
    }

    #[tokio::test]
    async fn test_no_head_when_content_type_present() {
        let client = MockAsyncHttpClient::new().with_response(URL, Some("image/gif"), vec![7]);
        let dl = downloader(client.clone());

        dl.fetch(URL).await.unwrap();
        assert_eq!(client.head_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_body_is_fetch_error() {
        let client = MockAsyncHttpClient::new().with_response(URL, Some("image/jpeg"), vec![]);
        let dl = downloader(client);

        let err = dl.fetch(URL).await.unwrap_err();
        assert!(matches!(err, ArtworkError::Fetch { .. }));
    }
}
