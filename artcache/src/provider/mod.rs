//! Remote source access.
//!
//! Everything that leaves the process goes through [`AsyncHttpClient`]:
//! manifests for the clip generator and images for the composite and resize
//! generators. [`Downloader`] layers retry and content-type discovery on top.

mod download;
pub(crate) mod http;
mod types;

pub use download::{
    Download, DownloadConfig, Downloader, DEFAULT_DOWNLOAD_ATTEMPTS, DEFAULT_DOWNLOAD_BASE_DELAY,
};
pub use http::{AsyncHttpClient, AsyncReqwestClient, DEFAULT_MAX_BODY_BYTES};
pub use types::{HttpResponse, ProviderError};
