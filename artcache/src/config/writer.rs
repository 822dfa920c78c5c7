//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let published_uri = config.server.published_uri.as_deref().unwrap_or("");

    format!(
        r#"[server]
; Listen address for the HTTP server (default: 0.0.0.0:3000)
bind = {}
; Public base URL used in artifact links, e.g. https://art.example.com
; If empty, PUBLISHED_URI from the environment is used, then https://art.cider.sh
published_uri = {}

[cache]
; Artifact store root. Artifacts are kept in animated-art/, artist-squares/ and icloud-art/
; subdirectories and are never evicted.
directory = {}

[generation]
; How a request for a missing artifact is answered:
;   wait           - generate in-process and wait up to wait_timeout_secs
;   queue_wait     - hand the job to the background queue and wait on it
;   queue_deferred - hand the job to the queue and answer 202 immediately
mode = {}
; Seconds a request waits before answering; generation keeps running (default: 30)
wait_timeout_secs = {}
; Status when the wait runs out: accepted (202) or error (500)
timeout_status = {}
; Attempts per in-process generation, first attempt included (default: 1)
sync_attempts = {}
; Concurrent in-process generations across all keys (default: 8)
max_concurrent = {}

[manifest]
; Narrowest HLS rendition accepted, in pixels (default: 450)
min_width = {}

[clip]
; Animated clip container: gif or webp
format = {}
; ffmpeg executable name or path
ffmpeg = {}
; ffmpeg thread count (default: 8)
threads = {}

[download]
; Timeout in seconds for HTTP requests (default: 30)
timeout = {}
; Attempts per source fetch, first attempt included (default: 3)
max_attempts = {}
; Base delay for exponential backoff between fetch attempts (default: 1000)
retry_base_delay_ms = {}
; Largest accepted source body in megabytes (default: 50)
max_body_mb = {}

[queue]
; Background workers, clamped to 3-10 (default: 5)
workers = {}
; Retries after the first attempt for network or transcode failures (default: 3)
max_retries = {}
; Base delay for retry backoff; retry n waits base * 2^(n-1) (default: 1000)
retry_base_delay_ms = {}

[validation]
; Comma-separated host suffixes source URLs must end with
allowed_domains = {}

[logging]
; Log file path (default: ~/.artcache/artcache.log)
file = {}
"#,
        config.server.bind,
        published_uri,
        path_to_string(&config.cache.directory),
        config.generation.mode,
        config.generation.wait_timeout_secs,
        config.generation.timeout_status,
        config.generation.sync_attempts,
        config.generation.max_concurrent,
        config.manifest.min_width,
        config.clip.format.extension(),
        path_to_string(&config.clip.ffmpeg),
        config.clip.threads,
        config.download.timeout,
        config.download.max_attempts,
        config.download.retry_base_delay_ms,
        config.download.max_body_mb,
        config.queue.workers,
        config.queue.max_retries,
        config.queue.retry_base_delay_ms,
        config.validation.allowed_domains.join(","),
        path_to_string(&config.logging.file),
    )
}

/// Renders a path, abbreviating the home directory as `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ResponseMode;
    use tempfile::TempDir;

    #[test]
    fn test_written_file_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.generation.mode = ResponseMode::QueueWait;
        config.server.published_uri = Some("https://art.example.com".to_string());
        config.queue.workers = 7;
        config.cache.directory = temp_dir.path().join("store");

        config.save_to(&config_path).unwrap();
        let loaded = ConfigFile::load_from(&config_path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_output_is_commented() {
        let content = to_config_string(&ConfigFile::default());
        assert!(content.contains("[generation]"));
        assert!(content.contains("; Status when the wait runs out"));
        assert!(content.contains("allowed_domains = .apple.com,.mzstatic.com"));
    }
}
