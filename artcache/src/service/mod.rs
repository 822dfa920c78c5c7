//! High-level service facade for artwork generation.
//!
//! This module wires the store, generators, orchestrator and work queue
//! behind one type, [`ArtworkService`], so transports only deal with
//! requests and [`ArtworkResponse`]s.
//!
//! # Example
//!
//! ```ignore
//! use artcache::service::{ArtworkService, ResponseMode, ServiceConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = ServiceConfig::builder()
//!     .mode(ResponseMode::QueueWait)
//!     .build();
//!
//! let service = ArtworkService::start(config, CancellationToken::new()).await?;
//! let response = service
//!     .generate_square(vec![
//!         "https://is1-ssl.mzstatic.com/a.jpg".into(),
//!         "https://is2-ssl.mzstatic.com/b.jpg".into(),
//!     ])
//!     .await;
//! ```

mod config;
mod error;
mod facade;
mod response;

pub use config::{
    resolve_published_uri, ResponseMode, ServiceConfig, ServiceConfigBuilder, TimeoutStatus,
    DEFAULT_FFMPEG_BINARY, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_PUBLISHED_URI, PUBLISHED_URI_ENV,
};
pub use error::ServiceError;
pub use facade::{ArtworkService, DefaultArtworkService};
pub use response::{messages, public_url, ArtworkResponse, ClassMessages};
