//! HTTP client abstraction for testability

use super::types::{HttpResponse, ProviderError};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Trait for asynchronous HTTP client operations.
///
/// Generators and the manifest selector only talk to the network through
/// this trait, so tests can substitute an in-memory client.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an async HTTP GET request.
    ///
    /// # Returns
    ///
    /// The response body and content type, or an error for transport
    /// failures and non-success statuses.
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, ProviderError>> + Send;

    /// Performs an async HTTP HEAD request and returns the `Content-Type`.
    fn head_content_type(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Option<String>, ProviderError>> + Send;
}

/// Default User-Agent string for HTTP requests.
const DEFAULT_USER_AGENT: &str = concat!("artcache/", env!("CARGO_PKG_VERSION"));

/// Default cap on response bodies (50 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Async HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl AsyncReqwestClient {
    /// Creates a new AsyncReqwestClient with default configuration.
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_timeout(30, DEFAULT_MAX_BODY_BYTES)
    }

    /// Creates a new AsyncReqwestClient with custom timeout and body cap.
    pub fn with_timeout(timeout_secs: u64, max_body_bytes: usize) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(DEFAULT_USER_AGENT)
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                ProviderError::HttpError(format!("Failed to create async HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            max_body_bytes,
        })
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, ProviderError> {
        trace!(url = url, "HTTP GET request starting");

        let mut response = match self.client.get(url).send().await {
            Ok(resp) => {
                debug!(
                    url = url,
                    status = resp.status().as_u16(),
                    "HTTP response received"
                );
                resp
            }
            Err(e) => {
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(ProviderError::HttpError(format!("Request failed: {}", e)));
            }
        };

        // Check HTTP status
        if !response.status().is_success() {
            warn!(
                url = url,
                status = response.status().as_u16(),
                "HTTP error status"
            );
            return Err(ProviderError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        // Read the body chunk by chunk so oversized responses are cut off
        // before they are fully buffered.
        let mut body = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    if body.len() + chunk.len() > self.max_body_bytes {
                        warn!(url = url, limit = self.max_body_bytes, "Response body too large");
                        return Err(ProviderError::BodyTooLarge {
                            url: url.to_string(),
                            limit: self.max_body_bytes,
                        });
                    }
                    body.extend_from_slice(&chunk);
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(url = url, error = %e, "Failed to read response body");
                    return Err(ProviderError::HttpError(format!(
                        "Failed to read response: {}",
                        e
                    )));
                }
            }
        }

        trace!(url = url, bytes = body.len(), "HTTP response body read");
        Ok(HttpResponse { content_type, body })
    }

    async fn head_content_type(&self, url: &str) -> Result<Option<String>, ProviderError> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| ProviderError::HttpError(format!("HEAD request failed: {}", e)))?;

        Ok(response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string))
    }
}
