//! User configuration stored in `~/.artcache/config.ini`.
//!
//! The file is optional. Every key has a default, a present key overlays
//! it, and [`ConfigFile::service_config`] turns the result into the
//! [`ServiceConfig`](crate::service::ServiceConfig) the service runs with.
//!
//! # Example
//!
//! ```
//! use artcache::config::ConfigFile;
//! use artcache::service::ResponseMode;
//!
//! let config = ConfigFile::default();
//! assert_eq!(config.generation.mode, ResponseMode::Wait);
//! assert_eq!(config.server.bind.port(), 3000);
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use file::{config_file_path, ConfigFileError};
pub use settings::{
    CacheSettings, ClipSettings, ConfigFile, DownloadSettings, GenerationSettings,
    LoggingSettings, ManifestSettings, QueueSettings, ServerSettings, ValidationSettings,
};
pub use defaults::{
    config_directory, default_cache_dir, default_config_path, default_log_file, CONFIG_DIR_NAME,
    CONFIG_FILE_NAME, DEFAULT_BIND, DEFAULT_LOG_FILE_NAME, DEFAULT_MAX_BODY_MB, DEFAULT_PORT,
};
