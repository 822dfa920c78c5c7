//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use crate::service::{ResponseMode, TimeoutStatus};
use crate::store::ClipFormat;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// HTTP server settings
    pub server: ServerSettings,
    /// Artifact store settings
    pub cache: CacheSettings,
    /// Request handling and orchestration settings
    pub generation: GenerationSettings,
    /// HLS rendition selection settings
    pub manifest: ManifestSettings,
    /// Animated clip settings
    pub clip: ClipSettings,
    /// Source download settings
    pub download: DownloadSettings,
    /// Background queue settings
    pub queue: QueueSettings,
    /// Source URL validation settings
    pub validation: ValidationSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Listen address
    pub bind: SocketAddr,
    /// Public base URL for artifact links. Falls back to `PUBLISHED_URI`,
    /// then to the built-in default.
    pub published_uri: Option<String>,
}

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Store root directory
    pub directory: PathBuf,
}

/// Generation configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSettings {
    /// How cache misses are answered.
    pub mode: ResponseMode,
    /// Seconds a request waits for its artifact before answering pending.
    pub wait_timeout_secs: u64,
    /// Status reported when the wait expires.
    pub timeout_status: TimeoutStatus,
    /// Attempts per synchronous generation, first attempt included.
    pub sync_attempts: u32,
    /// Concurrent synchronous generations across all keys.
    pub max_concurrent: usize,
}

/// Manifest configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSettings {
    /// Narrowest rendition accepted, in pixels.
    pub min_width: u32,
}

/// Animated clip configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipSettings {
    pub format: ClipFormat,
    /// ffmpeg executable name or path
    pub ffmpeg: PathBuf,
    /// ffmpeg `-threads` value
    pub threads: u32,
}

/// Download configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    /// Timeout in seconds for HTTP requests.
    pub timeout: u64,
    /// Attempts per source fetch, first attempt included.
    pub max_attempts: u32,
    /// Base delay in milliseconds for exponential backoff between attempts.
    pub retry_base_delay_ms: u64,
    /// Largest accepted source body in megabytes.
    pub max_body_mb: usize,
}

/// Background queue configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSettings {
    /// Concurrent workers. Clamped to 3-10.
    pub workers: usize,
    /// Retries after the first attempt for retryable failures.
    pub max_retries: u32,
    /// Base delay in milliseconds. Retry `n` waits `base * 2^(n-1)`.
    pub retry_base_delay_ms: u64,
}

/// Validation configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationSettings {
    /// Host suffixes source URLs must end with.
    pub allowed_domains: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
