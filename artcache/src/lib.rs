//! artcache - On-demand artwork derivatives behind a content-addressed cache
//!
//! Given a source URL, or a set of them, this library derives an artifact
//! once, stores it under a key computed from the inputs, and serves that
//! artifact on every later request:
//!
//! - animated clips (GIF or WebP) transcoded from HLS video manifests
//! - composite squares laid out from 2-4 artist images
//! - 1024×1024 resized copies of a single image
//!
//! Concurrent requests for the same key share one generation, a slow
//! generation never blocks its caller past the configured wait, and
//! failures are never cached.
//!
//! # High-Level API
//!
//! The [`service`] module provides the facade that transports build on:
//!
//! ```ignore
//! use artcache::config::ConfigFile;
//! use artcache::service::DefaultArtworkService;
//! use tokio_util::sync::CancellationToken;
//!
//! let config = ConfigFile::load()?.service_config();
//! let service = DefaultArtworkService::start(config, CancellationToken::new()).await?;
//!
//! let response = service.generate_resized("https://is1-ssl.mzstatic.com/a.jpg").await;
//! println!("{} {:?}", response.message(), response.url());
//! ```

pub mod config;
pub mod error;
pub mod generate;
pub mod key;
pub mod logging;
pub mod manifest;
pub mod orchestrator;
pub mod provider;
pub mod queue;
pub mod service;
pub mod store;
pub mod validate;

/// Version of the artcache library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
