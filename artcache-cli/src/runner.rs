//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization and service creation
//! to reduce duplication across command handlers.

use crate::error::CliError;
use artcache::config::{config_file_path, ConfigFile};
use artcache::logging::{init_logging, split_log_path, LoggingGuard};
use artcache::service::DefaultArtworkService;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Loads the configuration file from `--config` or the default location.
pub fn load_config(explicit: Option<&Path>) -> Result<(PathBuf, ConfigFile), CliError> {
    let path = config_file_path(explicit);
    let config = ConfigFile::load_from(&path)?;
    Ok((path, config))
}

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
    config_path: PathBuf,
}

impl CliRunner {
    /// Create a new CLI runner, loading config and initializing logging.
    pub fn new(explicit_config: Option<&Path>) -> Result<Self, CliError> {
        let (config_path, config) = load_config(explicit_config)?;

        let (log_dir, log_file) = split_log_path(&config.logging.file);
        let logging_guard = init_logging(&log_dir, &log_file)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
            config_path,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("artcache v{}", artcache::VERSION);
        info!(
            config = %self.config_path.display(),
            log = %self.logging_guard.path().display(),
            "artcache CLI: {} command",
            command
        );
    }

    /// Create the production service from the loaded configuration.
    pub async fn create_service(
        &self,
        shutdown: CancellationToken,
    ) -> Result<DefaultArtworkService, CliError> {
        DefaultArtworkService::start(self.config.service_config(), shutdown)
            .await
            .map_err(CliError::ServiceCreation)
            .inspect(|_| info!("Service created successfully"))
    }
}
