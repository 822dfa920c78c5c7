//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::{Ini, Properties};
use std::path::PathBuf;
use std::str::FromStr;

use super::defaults::clamp_workers;
use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [server] section
    if let Some(section) = ini.section(Some("server")) {
        if let Some(v) = section.get("bind") {
            config.server.bind = parse_value(
                "server",
                "bind",
                v,
                "must be a socket address like 0.0.0.0:3000",
            )?;
        }
        if let Some(v) = non_empty(section, "published_uri") {
            config.server.published_uri = Some(v.to_string());
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = non_empty(section, "directory") {
            config.cache.directory = expand_tilde(v);
        }
    }

    // [generation] section
    if let Some(section) = ini.section(Some("generation")) {
        if let Some(v) = section.get("mode") {
            config.generation.mode = parse_value(
                "generation",
                "mode",
                v,
                "must be one of: wait, queue_wait, queue_deferred",
            )?;
        }
        if let Some(v) = section.get("wait_timeout_secs") {
            config.generation.wait_timeout_secs = parse_positive(
                "generation",
                "wait_timeout_secs",
                v,
                "must be a positive integer (seconds)",
            )?;
        }
        if let Some(v) = section.get("timeout_status") {
            config.generation.timeout_status = parse_value(
                "generation",
                "timeout_status",
                v,
                "must be 'accepted' or 'error'",
            )?;
        }
        if let Some(v) = section.get("sync_attempts") {
            config.generation.sync_attempts = parse_positive(
                "generation",
                "sync_attempts",
                v,
                "must be a positive integer",
            )?;
        }
        if let Some(v) = section.get("max_concurrent") {
            config.generation.max_concurrent = parse_positive(
                "generation",
                "max_concurrent",
                v,
                "must be a positive integer",
            )?;
        }
    }

    // [manifest] section
    if let Some(section) = ini.section(Some("manifest")) {
        if let Some(v) = section.get("min_width") {
            config.manifest.min_width =
                parse_value("manifest", "min_width", v, "must be an integer (pixels)")?;
        }
    }

    // [clip] section
    if let Some(section) = ini.section(Some("clip")) {
        if let Some(v) = section.get("format") {
            config.clip.format = parse_value("clip", "format", v, "must be 'gif' or 'webp'")?;
        }
        if let Some(v) = non_empty(section, "ffmpeg") {
            config.clip.ffmpeg = expand_tilde(v);
        }
        if let Some(v) = section.get("threads") {
            config.clip.threads =
                parse_positive("clip", "threads", v, "must be a positive integer")?;
        }
    }

    // [download] section
    if let Some(section) = ini.section(Some("download")) {
        if let Some(v) = section.get("timeout") {
            config.download.timeout = parse_positive(
                "download",
                "timeout",
                v,
                "must be a positive integer (seconds)",
            )?;
        }
        if let Some(v) = section.get("max_attempts") {
            config.download.max_attempts = parse_positive(
                "download",
                "max_attempts",
                v,
                "must be a positive integer",
            )?;
        }
        if let Some(v) = section.get("retry_base_delay_ms") {
            config.download.retry_base_delay_ms = parse_value(
                "download",
                "retry_base_delay_ms",
                v,
                "must be an integer (milliseconds)",
            )?;
        }
        if let Some(v) = section.get("max_body_mb") {
            config.download.max_body_mb = parse_positive(
                "download",
                "max_body_mb",
                v,
                "must be a positive integer (megabytes)",
            )?;
        }
    }

    // [queue] section
    if let Some(section) = ini.section(Some("queue")) {
        if let Some(v) = section.get("workers") {
            let workers: usize =
                parse_value("queue", "workers", v, "must be a positive integer")?;
            config.queue.workers = clamp_workers(workers);
        }
        if let Some(v) = section.get("max_retries") {
            config.queue.max_retries =
                parse_value("queue", "max_retries", v, "must be an integer")?;
        }
        if let Some(v) = section.get("retry_base_delay_ms") {
            config.queue.retry_base_delay_ms = parse_value(
                "queue",
                "retry_base_delay_ms",
                v,
                "must be an integer (milliseconds)",
            )?;
        }
    }

    // [validation] section
    if let Some(section) = ini.section(Some("validation")) {
        if let Some(v) = section.get("allowed_domains") {
            let domains = parse_list(v);
            if domains.is_empty() {
                return Err(ConfigFileError::InvalidValue {
                    section: "validation".to_string(),
                    key: "allowed_domains".to_string(),
                    value: v.to_string(),
                    reason: "must list at least one domain suffix".to_string(),
                });
            }
            config.validation.allowed_domains = domains;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section, "file") {
            config.logging.file = expand_tilde(v);
        }
    }

    Ok(config)
}

/// Returns the trimmed value of `key`, or `None` when it is missing or blank.
fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_value<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .to_lowercase()
        .parse()
        .map_err(|_| ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        })
}

fn parse_positive<T>(section: &str, key: &str, value: &str, reason: &str) -> Result<T, ConfigFileError>
where
    T: FromStr + PartialOrd + Default,
{
    let parsed: T = parse_value(section, key, value, reason)?;
    if parsed <= T::default() {
        return Err(ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        });
    }
    Ok(parsed)
}

/// Splits a comma-separated list, dropping blanks.
pub(super) fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;
    use crate::service::{ResponseMode, TimeoutStatus};
    use crate::store::ClipFormat;
    use tempfile::TempDir;

    fn load(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(&config_path, content).unwrap();
        ConfigFile::load_from(&config_path)
    }

    #[test]
    fn test_invalid_mode() {
        let err = load(
            r#"
[generation]
mode = eventually
"#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("generation.mode"));
        assert!(err.to_string().contains("queue_deferred"));
    }

    #[test]
    fn test_invalid_bind() {
        let err = load(
            r#"
[server]
bind = localhost
"#,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ConfigFileError::InvalidValue { ref key, .. } if key == "bind"
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = load(
            r#"
[generation]
wait_timeout_secs = 0
"#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("wait_timeout_secs"));
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/test/path");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(path, home.join("test/path"));
        }

        // Non-tilde paths should be unchanged
        let path = expand_tilde("/absolute/path");
        assert_eq!(path, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_partial_config() {
        // Only specify some settings, rest should use defaults
        let config = load(
            r#"
[generation]
mode = Queue_Deferred
timeout_status = error

[clip]
format = webp

[download]
timeout = 45
"#,
        )
        .unwrap();

        // Specified values
        assert_eq!(config.generation.mode, ResponseMode::QueueDeferred);
        assert_eq!(config.generation.timeout_status, TimeoutStatus::Error);
        assert_eq!(config.clip.format, ClipFormat::Webp);
        assert_eq!(config.download.timeout, 45);

        // Default values
        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert_eq!(config.manifest.min_width, 450);
        assert_eq!(config.download.max_body_mb, DEFAULT_MAX_BODY_MB);
    }

    #[test]
    fn test_queue_workers_clamped() {
        let config = load(
            r#"
[queue]
workers = 64
max_retries = 0
"#,
        )
        .unwrap();

        assert_eq!(config.queue.workers, crate::queue::MAX_WORKERS);
        assert_eq!(config.queue.max_retries, 0);
    }

    #[test]
    fn test_allowed_domains_list() {
        let config = load(
            r#"
[validation]
allowed_domains = .apple.com, example.org ,
"#,
        )
        .unwrap();

        assert_eq!(
            config.validation.allowed_domains,
            vec![".apple.com".to_string(), "example.org".to_string()]
        );

        assert!(load("[validation]\nallowed_domains = ,\n").is_err());
    }

    #[test]
    fn test_blank_published_uri_means_unset() {
        let config = load("[server]\npublished_uri =\n").unwrap();
        assert!(config.server.published_uri.is_none());

        let config = load("[server]\npublished_uri = https://art.example.com\n").unwrap();
        assert_eq!(
            config.server.published_uri.as_deref(),
            Some("https://art.example.com")
        );
    }
}
