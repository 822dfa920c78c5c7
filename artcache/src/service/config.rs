//! Service configuration types.

use crate::manifest::DEFAULT_MIN_WIDTH;
use crate::orchestrator::OrchestratorConfig;
use crate::provider::{DownloadConfig, DEFAULT_MAX_BODY_BYTES};
use crate::queue::QueueConfig;
use crate::store::ClipFormat;
use crate::validate::DEFAULT_ALLOWED_DOMAINS;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Public base URL used when neither config nor environment provides one.
pub const DEFAULT_PUBLISHED_URI: &str = "https://art.cider.sh";

/// Environment variable consulted for the public base URL.
pub const PUBLISHED_URI_ENV: &str = "PUBLISHED_URI";

/// Default HTTP request timeout for source fetches, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default ffmpeg executable.
pub const DEFAULT_FFMPEG_BINARY: &str = "ffmpeg";

/// How a miss is answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseMode {
    /// Generate on the request path, bounded by the wait timeout.
    #[default]
    Wait,
    /// Enqueue a durable job and wait on it up to the wait timeout.
    QueueWait,
    /// Enqueue a durable job and answer `Pending` at once.
    QueueDeferred,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wait => "wait",
            Self::QueueWait => "queue_wait",
            Self::QueueDeferred => "queue_deferred",
        }
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wait" => Ok(Self::Wait),
            "queue_wait" => Ok(Self::QueueWait),
            "queue_deferred" => Ok(Self::QueueDeferred),
            other => Err(format!(
                "unknown mode '{}', expected wait, queue_wait or queue_deferred",
                other
            )),
        }
    }
}

/// Status reported when a caller's wait runs out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeoutStatus {
    /// 202 with a "still being processed" message
    #[default]
    Accepted,
    /// 500 with a "timed out" error
    Error,
}

impl TimeoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for TimeoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeoutStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accepted" => Ok(Self::Accepted),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "unknown timeout status '{}', expected accepted or error",
                other
            )),
        }
    }
}

/// Resolves the public base URL: explicit value, then `PUBLISHED_URI`, then
/// the built-in default. Trailing slashes are removed.
pub fn resolve_published_uri(configured: Option<&str>) -> String {
    let from_env = std::env::var(PUBLISHED_URI_ENV).ok();
    resolve_published_uri_from(configured, from_env.as_deref())
}

fn resolve_published_uri_from(configured: Option<&str>, env: Option<&str>) -> String {
    [configured, env]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(DEFAULT_PUBLISHED_URI)
        .trim_end_matches('/')
        .to_string()
}

/// Configuration for the artwork service.
///
/// Combines everything needed to wire the store, generators, orchestrator
/// and queue.
///
/// # Example
///
/// ```
/// use artcache::service::{ResponseMode, ServiceConfig};
///
/// let config = ServiceConfig::builder()
///     .cache_directory("/tmp/artcache".into())
///     .mode(ResponseMode::QueueDeferred)
///     .published_uri("https://art.example.com/")
///     .build();
///
/// assert_eq!(config.published_uri(), "https://art.example.com");
/// assert_eq!(config.mode(), ResponseMode::QueueDeferred);
/// ```
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Store root
    cache_directory: PathBuf,
    /// How misses are answered
    mode: ResponseMode,
    /// Status for an expired wait
    timeout_status: TimeoutStatus,
    /// Public base URL for artifact links
    published_uri: String,
    /// Orchestrator tuning (wait timeout, sync retries, concurrency)
    orchestrator: OrchestratorConfig,
    /// Background queue tuning
    queue: QueueConfig,
    /// Source fetch retry policy
    download: DownloadConfig,
    /// Source fetch timeout in seconds
    http_timeout_secs: u64,
    /// Largest accepted source body
    max_body_bytes: usize,
    /// Narrowest admissible rendition
    min_width: u32,
    /// Animated clip container
    clip_format: ClipFormat,
    /// ffmpeg executable
    ffmpeg_binary: PathBuf,
    /// ffmpeg thread count
    ffmpeg_threads: u32,
    /// Allowed source host suffixes
    allowed_domains: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ServiceConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    pub fn cache_directory(&self) -> &PathBuf {
        &self.cache_directory
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    pub fn timeout_status(&self) -> TimeoutStatus {
        self.timeout_status
    }

    pub fn published_uri(&self) -> &str {
        &self.published_uri
    }

    pub fn orchestrator(&self) -> &OrchestratorConfig {
        &self.orchestrator
    }

    pub fn queue(&self) -> &QueueConfig {
        &self.queue
    }

    pub fn download(&self) -> &DownloadConfig {
        &self.download
    }

    pub fn http_timeout_secs(&self) -> u64 {
        self.http_timeout_secs
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    pub fn min_width(&self) -> u32 {
        self.min_width
    }

    pub fn clip_format(&self) -> ClipFormat {
        self.clip_format
    }

    pub fn ffmpeg_binary(&self) -> &PathBuf {
        &self.ffmpeg_binary
    }

    pub fn ffmpeg_threads(&self) -> u32 {
        self.ffmpeg_threads
    }

    pub fn allowed_domains(&self) -> &[String] {
        &self.allowed_domains
    }
}

/// Builder for ServiceConfig.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfigBuilder {
    cache_directory: Option<PathBuf>,
    mode: Option<ResponseMode>,
    timeout_status: Option<TimeoutStatus>,
    published_uri: Option<String>,
    orchestrator: Option<OrchestratorConfig>,
    queue: Option<QueueConfig>,
    download: Option<DownloadConfig>,
    http_timeout_secs: Option<u64>,
    max_body_bytes: Option<usize>,
    min_width: Option<u32>,
    clip_format: Option<ClipFormat>,
    ffmpeg_binary: Option<PathBuf>,
    ffmpeg_threads: Option<u32>,
    allowed_domains: Option<Vec<String>>,
}

impl ServiceConfigBuilder {
    /// Set the store root.
    pub fn cache_directory(mut self, path: PathBuf) -> Self {
        self.cache_directory = Some(path);
        self
    }

    pub fn mode(mut self, mode: ResponseMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn timeout_status(mut self, status: TimeoutStatus) -> Self {
        self.timeout_status = Some(status);
        self
    }

    /// Set the public base URL. Empty values fall through to the
    /// environment and then the default.
    pub fn published_uri(mut self, uri: impl Into<String>) -> Self {
        self.published_uri = Some(uri.into());
        self
    }

    pub fn orchestrator(mut self, config: OrchestratorConfig) -> Self {
        self.orchestrator = Some(config);
        self
    }

    pub fn queue(mut self, config: QueueConfig) -> Self {
        self.queue = Some(config);
        self
    }

    pub fn download(mut self, config: DownloadConfig) -> Self {
        self.download = Some(config);
        self
    }

    pub fn http_timeout_secs(mut self, secs: u64) -> Self {
        self.http_timeout_secs = Some(secs);
        self
    }

    pub fn max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = Some(bytes);
        self
    }

    pub fn min_width(mut self, width: u32) -> Self {
        self.min_width = Some(width);
        self
    }

    pub fn clip_format(mut self, format: ClipFormat) -> Self {
        self.clip_format = Some(format);
        self
    }

    pub fn ffmpeg_binary(mut self, path: PathBuf) -> Self {
        self.ffmpeg_binary = Some(path);
        self
    }

    pub fn ffmpeg_threads(mut self, threads: u32) -> Self {
        self.ffmpeg_threads = Some(threads);
        self
    }

    pub fn allowed_domains(mut self, domains: Vec<String>) -> Self {
        self.allowed_domains = Some(domains);
        self
    }

    /// Build the configuration with defaults for unset values.
    pub fn build(self) -> ServiceConfig {
        use crate::generate::transcode::DEFAULT_TRANSCODE_THREADS;

        ServiceConfig {
            cache_directory: self
                .cache_directory
                .unwrap_or_else(crate::config::default_cache_dir),
            mode: self.mode.unwrap_or_default(),
            timeout_status: self.timeout_status.unwrap_or_default(),
            published_uri: resolve_published_uri(self.published_uri.as_deref()),
            orchestrator: self.orchestrator.unwrap_or_default(),
            queue: self.queue.unwrap_or_default(),
            download: self.download.unwrap_or_default(),
            http_timeout_secs: self.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            max_body_bytes: self.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES),
            min_width: self.min_width.unwrap_or(DEFAULT_MIN_WIDTH),
            clip_format: self.clip_format.unwrap_or_default(),
            ffmpeg_binary: self
                .ffmpeg_binary
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FFMPEG_BINARY)),
            ffmpeg_threads: self.ffmpeg_threads.unwrap_or(DEFAULT_TRANSCODE_THREADS),
            allowed_domains: self.allowed_domains.unwrap_or_else(|| {
                DEFAULT_ALLOWED_DOMAINS
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_published_uri_precedence() {
        assert_eq!(
            resolve_published_uri_from(Some("https://a.example/"), Some("https://b.example")),
            "https://a.example"
        );
        assert_eq!(
            resolve_published_uri_from(Some("  "), Some("https://b.example")),
            "https://b.example"
        );
        assert_eq!(resolve_published_uri_from(None, None), DEFAULT_PUBLISHED_URI);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("wait".parse::<ResponseMode>(), Ok(ResponseMode::Wait));
        assert_eq!(
            "Queue_Deferred".parse::<ResponseMode>(),
            Ok(ResponseMode::QueueDeferred)
        );
        assert!("later".parse::<ResponseMode>().is_err());
        assert_eq!("error".parse::<TimeoutStatus>(), Ok(TimeoutStatus::Error));
    }

    #[test]
    fn test_builder_defaults() {
        let config = ServiceConfig::builder()
            .cache_directory(PathBuf::from("/tmp/c"))
            .published_uri("https://art.example.com")
            .build();

        assert_eq!(config.mode(), ResponseMode::Wait);
        assert_eq!(config.timeout_status(), TimeoutStatus::Accepted);
        assert_eq!(config.min_width(), 450);
        assert_eq!(config.clip_format(), ClipFormat::Gif);
        assert_eq!(config.ffmpeg_threads(), 8);
        assert_eq!(config.max_body_bytes(), 50 * 1024 * 1024);
        assert_eq!(config.allowed_domains().len(), 2);
    }
}
