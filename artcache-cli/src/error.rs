//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use artcache::config::ConfigFileError;
use artcache::error::ArtworkError;
use artcache::service::ServiceError;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::process;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Configuration file could not be read or written
    ConfigFile(ConfigFileError),
    /// Failed to create service
    ServiceCreation(ServiceError),
    /// Failed to bind the listen address
    Bind { addr: SocketAddr, error: io::Error },
    /// HTTP server error
    Serve(io::Error),
    /// One-shot generation failed
    Generate(ArtworkError),
    /// Failed to inspect or clean the cache directory
    Cache(io::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::ConfigFile(ConfigFileError::InvalidValue { .. }) => {
                eprintln!();
                eprintln!("Fix the value in config.ini, or regenerate a default file with:");
                eprintln!("  artcache config init --force");
            }
            CliError::ServiceCreation(ServiceError::CacheDirectory { .. }) | CliError::Cache(_) => {
                eprintln!();
                eprintln!("Check that the cache directory exists and is writable.");
                eprintln!("It is set by [cache] directory in config.ini.");
            }
            CliError::Bind { .. } => {
                eprintln!();
                eprintln!("Common issues:");
                eprintln!("  1. Another process is using the port");
                eprintln!("  2. Ports below 1024 need elevated privileges");
                eprintln!("Use --bind or [server] bind in config.ini to pick another address.");
            }
            CliError::Generate(ArtworkError::Transcode(_)) => {
                eprintln!();
                eprintln!("Animated clips need ffmpeg. Make sure it is installed and that");
                eprintln!("[clip] ffmpeg in config.ini points at the executable.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::ServiceCreation(e) => write!(f, "Failed to create service: {}", e),
            CliError::Bind { addr, error } => write!(f, "Failed to bind {}: {}", addr, error),
            CliError::Serve(e) => write!(f, "HTTP server error: {}", e),
            CliError::Generate(e) => write!(f, "Generation failed: {}", e),
            CliError::Cache(e) => write!(f, "Cache error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::ServiceCreation(e) => Some(e),
            CliError::Bind { error, .. } => Some(error),
            CliError::Serve(e) => Some(e),
            CliError::Generate(e) => Some(e),
            CliError::Cache(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ServiceError> for CliError {
    fn from(e: ServiceError) -> Self {
        CliError::ServiceCreation(e)
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}
