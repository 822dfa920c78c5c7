//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use artcache::error::ArtworkError;
use artcache::generate::transcode::Transcoder;
use artcache::provider::{AsyncHttpClient, HttpResponse, ProviderError};
use artcache::service::{ArtworkService, ServiceConfig, ServiceConfigBuilder};
use artcache::store::ClipFormat;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const MANIFEST: &str = "https://video-ssl.itunes.apple.com/itunes-assets/x/master.m3u8";
pub const IMG_A: &str = "https://is1-ssl.mzstatic.com/image/a.jpg";
pub const IMG_B: &str = "https://is2-ssl.mzstatic.com/image/b.png";
pub const IMG_C: &str = "https://is3-ssl.mzstatic.com/image/c.jpg";
pub const BASE: &str = "https://art.example.com";

pub type TestService = ArtworkService<StubHttpClient, StubTranscoder>;

/// In-memory HTTP client that counts GETs.
#[derive(Clone, Default)]
pub struct StubHttpClient {
    responses: Arc<Mutex<HashMap<String, HttpResponse>>>,
    gets: Arc<AtomicUsize>,
}

impl StubHttpClient {
    /// Client serving a manifest and three images.
    pub fn standard() -> Self {
        let client = Self::default();
        client.insert(
            MANIFEST,
            "application/x-mpegurl",
            concat!(
                "#EXTM3U\n",
                "#EXT-X-STREAM-INF:BANDWIDTH=800000,CODECS=\"avc1.64001f\",RESOLUTION=320x320\n",
                "v320.m3u8\n",
                "#EXT-X-STREAM-INF:BANDWIDTH=1600000,CODECS=\"avc1.64001f\",RESOLUTION=480x480\n",
                "v480.m3u8\n",
                "#EXT-X-STREAM-INF:BANDWIDTH=3200000,CODECS=\"hvc1.2.4.L123\",RESOLUTION=720x720\n",
                "v720.m3u8\n",
            )
            .as_bytes()
            .to_vec(),
        );
        client.insert(IMG_A, "image/jpeg", image_bytes(64, 48, [220, 20, 20], ImageFormat::Jpeg));
        client.insert(IMG_B, "image/png", image_bytes(48, 64, [20, 220, 20], ImageFormat::Png));
        client.insert(IMG_C, "image/jpeg", image_bytes(50, 50, [20, 20, 220], ImageFormat::Jpeg));
        client
    }

    pub fn insert(&self, url: &str, content_type: &str, body: Vec<u8>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), HttpResponse::new(Some(content_type), body));
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

impl AsyncHttpClient for StubHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, ProviderError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let found = self.responses.lock().unwrap().get(url).cloned();
        found.ok_or_else(|| ProviderError::Status {
            url: url.to_string(),
            status: 404,
        })
    }

    async fn head_content_type(&self, url: &str) -> Result<Option<String>, ProviderError> {
        let found = self.responses.lock().unwrap().get(url).cloned();
        Ok(found.and_then(|r| r.content_type))
    }
}

/// Transcoder that writes fixed bytes, optionally failing its first calls.
#[derive(Clone)]
pub struct StubTranscoder {
    output: Vec<u8>,
    delay: Duration,
    fail_first: usize,
    calls: Arc<AtomicUsize>,
    sources: Arc<Mutex<Vec<String>>>,
}

impl StubTranscoder {
    pub fn new() -> Self {
        Self {
            output: b"GIF89a-stub".to_vec(),
            delay: Duration::ZERO,
            fail_first: 0,
            calls: Arc::new(AtomicUsize::new(0)),
            sources: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fails the first `n` calls with a transcode error.
    pub fn failing_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    /// Writes nothing, leaving a zero-byte output.
    pub fn writing_nothing(mut self) -> Self {
        self.output.clear();
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn sources(&self) -> Vec<String> {
        self.sources.lock().unwrap().clone()
    }
}

impl Transcoder for StubTranscoder {
    async fn transcode(
        &self,
        source_url: &str,
        output: &Path,
        _format: ClipFormat,
    ) -> Result<(), ArtworkError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.sources.lock().unwrap().push(source_url.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if call < self.fail_first {
            return Err(ArtworkError::Transcode(format!("stub failure {}", call + 1)));
        }
        tokio::fs::write(output, &self.output)
            .await
            .map_err(|e| ArtworkError::Transcode(e.to_string()))
    }
}

/// Encodes a solid-colour image.
pub fn image_bytes(width: u32, height: u32, color: [u8; 3], format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}

/// Configuration rooted at `root` with the test base URL.
pub fn config_builder(root: &Path) -> ServiceConfigBuilder {
    ServiceConfig::builder()
        .cache_directory(root.to_path_buf())
        .published_uri(BASE)
}

pub async fn start(
    config: ServiceConfig,
    client: StubHttpClient,
    transcoder: StubTranscoder,
) -> TestService {
    ArtworkService::with_components(config, client, transcoder, CancellationToken::new())
        .await
        .unwrap()
}

/// Polls `check` until it returns true or two seconds pass.
pub async fn eventually<F, Fut>(check: F) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
