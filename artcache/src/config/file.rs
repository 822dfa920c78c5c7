//! Configuration file handling for ~/.artcache/config.ini.
//!
//! Loads and saves user configuration with sensible defaults.
//! Settings structs live in [`super::settings`], constants in [`super::defaults`],
//! parsing in [`super::parser`], and serialization in [`super::writer`].

use ini::Ini;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use super::defaults::*;
use super::settings::*;

use crate::orchestrator::OrchestratorConfig;
use crate::provider::DownloadConfig;
use crate::queue::QueueConfig;
use crate::service::ServiceConfig;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.artcache/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&default_config_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Create a default config file at `path` if none exists.
    ///
    /// Returns true if a file was written.
    pub fn ensure_exists(path: &Path) -> Result<bool, ConfigFileError> {
        if path.exists() {
            return Ok(false);
        }
        Self::default().save_to(path)?;
        Ok(true)
    }

    /// Renders the file as it would be saved.
    pub fn to_ini_string(&self) -> String {
        super::writer::to_config_string(self)
    }

    /// Builds the service configuration these settings describe.
    pub fn service_config(&self) -> ServiceConfig {
        let orchestrator = OrchestratorConfig::new()
            .with_wait_timeout(Duration::from_secs(self.generation.wait_timeout_secs))
            .with_sync_attempts(self.generation.sync_attempts)
            .with_max_concurrent(self.generation.max_concurrent);
        let queue = QueueConfig::new()
            .with_workers(self.queue.workers)
            .with_max_retries(self.queue.max_retries)
            .with_retry_base_delay(Duration::from_millis(self.queue.retry_base_delay_ms));
        let download = DownloadConfig::default()
            .with_max_attempts(self.download.max_attempts)
            .with_base_delay(Duration::from_millis(self.download.retry_base_delay_ms));

        let mut builder = ServiceConfig::builder()
            .cache_directory(self.cache.directory.clone())
            .mode(self.generation.mode)
            .timeout_status(self.generation.timeout_status)
            .orchestrator(orchestrator)
            .queue(queue)
            .download(download)
            .http_timeout_secs(self.download.timeout)
            .max_body_bytes(self.download.max_body_mb * 1024 * 1024)
            .min_width(self.manifest.min_width)
            .clip_format(self.clip.format)
            .ffmpeg_binary(self.clip.ffmpeg.clone())
            .ffmpeg_threads(self.clip.threads)
            .allowed_domains(self.validation.allowed_domains.clone());

        if let Some(uri) = &self.server.published_uri {
            builder = builder.published_uri(uri.clone());
        }

        builder.build()
    }
}

/// Resolves the config path: an explicit override, else the default.
pub fn config_file_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ResponseMode;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();

        assert_eq!(config.server.bind.port(), DEFAULT_PORT);
        assert!(config.server.published_uri.is_none());
        assert_eq!(config.cache.directory, default_cache_dir());
        assert_eq!(config.generation.mode, ResponseMode::Wait);
        assert_eq!(config.generation.wait_timeout_secs, 30);
        assert_eq!(config.generation.sync_attempts, 1);
        assert_eq!(config.queue.workers, 5);
        assert_eq!(config.download.max_body_mb, 50);
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.ini");

        let config = ConfigFile::load_from(&config_path).unwrap();

        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_ensure_exists_writes_once() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.ini");

        assert!(ConfigFile::ensure_exists(&config_path).unwrap());
        assert!(config_path.exists());
        assert!(!ConfigFile::ensure_exists(&config_path).unwrap());
    }

    #[test]
    fn test_service_config_carries_settings() {
        let mut config = ConfigFile::default();
        config.generation.mode = ResponseMode::QueueDeferred;
        config.generation.wait_timeout_secs = 5;
        config.server.published_uri = Some("https://art.example.com/".to_string());
        config.download.max_body_mb = 2;
        config.queue.workers = 4;

        let service = config.service_config();

        assert_eq!(service.mode(), ResponseMode::QueueDeferred);
        assert_eq!(service.orchestrator().wait_timeout(), Duration::from_secs(5));
        assert_eq!(service.published_uri(), "https://art.example.com");
        assert_eq!(service.max_body_bytes(), 2 * 1024 * 1024);
        assert_eq!(service.queue().workers(), 4);
        assert_eq!(service.cache_directory(), &config.cache.directory);
    }

    #[test]
    fn test_config_file_path_override() {
        let explicit = PathBuf::from("/tmp/custom.ini");
        assert_eq!(config_file_path(Some(&explicit)), explicit);
        assert_eq!(config_file_path(None), default_config_path());
    }
}
