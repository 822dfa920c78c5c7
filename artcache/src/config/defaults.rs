//! Default values and constants for all configuration settings.
//!
//! Contains the `DEFAULT_*` constants, path helpers, and the
//! `ConfigFile::default()` implementation.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use super::settings::*;
use crate::generate::transcode::DEFAULT_TRANSCODE_THREADS;
use crate::manifest::DEFAULT_MIN_WIDTH;
use crate::orchestrator::{DEFAULT_MAX_CONCURRENT, DEFAULT_SYNC_ATTEMPTS, DEFAULT_WAIT_TIMEOUT};
use crate::provider::{DEFAULT_DOWNLOAD_ATTEMPTS, DEFAULT_DOWNLOAD_BASE_DELAY};
use crate::queue::{
    DEFAULT_MAX_RETRIES, DEFAULT_QUEUE_RETRY_BASE_DELAY, DEFAULT_WORKERS, MAX_WORKERS,
    MIN_WORKERS,
};
use crate::service::{DEFAULT_FFMPEG_BINARY, DEFAULT_HTTP_TIMEOUT_SECS};
use crate::validate::DEFAULT_ALLOWED_DOMAINS;

// =============================================================================
// Paths
// =============================================================================

/// Name of the per-user configuration directory under `$HOME`.
pub const CONFIG_DIR_NAME: &str = ".artcache";

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Default log file name.
pub const DEFAULT_LOG_FILE_NAME: &str = "artcache.log";

/// Get the path to the config directory (~/.artcache).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Get the path to the config file (~/.artcache/config.ini).
pub fn default_config_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

/// Default artifact store root (~/.artcache/cache).
pub fn default_cache_dir() -> PathBuf {
    config_directory().join("cache")
}

/// Default log file (~/.artcache/artcache.log).
pub fn default_log_file() -> PathBuf {
    config_directory().join(DEFAULT_LOG_FILE_NAME)
}

// =============================================================================
// Server
// =============================================================================

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default listen address (0.0.0.0:3000).
pub const DEFAULT_BIND: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT);

// =============================================================================
// Download
// =============================================================================

/// Default largest source body in megabytes.
pub const DEFAULT_MAX_BODY_MB: usize = 50;

/// Clamps the queue worker count to its valid range and logs if clamped.
pub(super) fn clamp_workers(value: usize) -> usize {
    if value < MIN_WORKERS {
        tracing::warn!(
            requested = value,
            min = MIN_WORKERS,
            max = MAX_WORKERS,
            "queue workers below minimum, clamping to {}",
            MIN_WORKERS
        );
        MIN_WORKERS
    } else if value > MAX_WORKERS {
        tracing::warn!(
            requested = value,
            min = MIN_WORKERS,
            max = MAX_WORKERS,
            "queue workers above maximum, clamping to {}",
            MAX_WORKERS
        );
        MAX_WORKERS
    } else {
        value
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind: DEFAULT_BIND,
                published_uri: None,
            },
            cache: CacheSettings {
                directory: default_cache_dir(),
            },
            generation: GenerationSettings {
                mode: Default::default(),
                wait_timeout_secs: DEFAULT_WAIT_TIMEOUT.as_secs(),
                timeout_status: Default::default(),
                sync_attempts: DEFAULT_SYNC_ATTEMPTS,
                max_concurrent: DEFAULT_MAX_CONCURRENT,
            },
            manifest: ManifestSettings {
                min_width: DEFAULT_MIN_WIDTH,
            },
            clip: ClipSettings {
                format: Default::default(),
                ffmpeg: PathBuf::from(DEFAULT_FFMPEG_BINARY),
                threads: DEFAULT_TRANSCODE_THREADS,
            },
            download: DownloadSettings {
                timeout: DEFAULT_HTTP_TIMEOUT_SECS,
                max_attempts: DEFAULT_DOWNLOAD_ATTEMPTS,
                retry_base_delay_ms: DEFAULT_DOWNLOAD_BASE_DELAY.as_millis() as u64,
                max_body_mb: DEFAULT_MAX_BODY_MB,
            },
            queue: QueueSettings {
                workers: DEFAULT_WORKERS,
                max_retries: DEFAULT_MAX_RETRIES,
                retry_base_delay_ms: DEFAULT_QUEUE_RETRY_BASE_DELAY.as_millis() as u64,
            },
            validation: ValidationSettings {
                allowed_domains: DEFAULT_ALLOWED_DOMAINS
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            },
            logging: LoggingSettings {
                file: default_log_file(),
            },
        }
    }
}
