//! Artifact generators.
//!
//! Every generator has the same shape: fetch → decode → transform → encode →
//! commit. Nothing is written under a final name unless every stage
//! succeeded.
//!
//! - [`Generators::animated_clip`] selects a rendition and runs the transcoder
//! - [`Generators::composite_square`] lays 2-4 images out on a square canvas
//! - [`Generators::resized_copy`] scales one image to a fixed square

pub mod composite;
pub mod decode;
pub mod resize;
pub mod transcode;

use crate::error::ArtworkError;
use crate::key::{derive_composite_key, derive_key, CacheKey};
use crate::manifest::{SelectionPolicy, StreamSelector};
use crate::provider::{AsyncHttpClient, Download, Downloader};
use crate::store::{ArtifactClass, ArtifactLocation, ArtifactStore, ClipFormat};
use composite::{QUEUE_JPEG_QUALITY, SQUARE_SIZE, SYNC_JPEG_QUALITY};
use decode::DecoderChain;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{info, instrument};
use transcode::Transcoder;

/// What to generate, with the inputs that identify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    AnimatedClip { manifest_url: String },
    CompositeSquare { image_urls: Vec<String> },
    ResizedCopy { image_url: String },
}

impl GenerationRequest {
    /// Artifact class produced by this request.
    pub fn class(&self) -> ArtifactClass {
        match self {
            Self::AnimatedClip { .. } => ArtifactClass::AnimatedClip,
            Self::CompositeSquare { .. } => ArtifactClass::CompositeSquare,
            Self::ResizedCopy { .. } => ArtifactClass::ResizedCopy,
        }
    }

    /// Cache key derived from the request's URLs.
    pub fn key(&self) -> CacheKey {
        match self {
            Self::AnimatedClip { manifest_url } => derive_key(manifest_url),
            Self::CompositeSquare { image_urls } => derive_composite_key(image_urls),
            Self::ResizedCopy { image_url } => derive_key(image_url),
        }
    }

    /// All source URLs referenced by the request.
    pub fn urls(&self) -> Vec<&str> {
        match self {
            Self::AnimatedClip { manifest_url } => vec![manifest_url.as_str()],
            Self::CompositeSquare { image_urls } => {
                image_urls.iter().map(String::as_str).collect()
            }
            Self::ResizedCopy { image_url } => vec![image_url.as_str()],
        }
    }
}

/// Which path triggered a generation. Composite JPEG quality differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Generated while a caller waits
    Request,
    /// Generated by a background queue worker
    Queue,
}

/// The three generators and the collaborators they share.
pub struct Generators<C, T> {
    downloader: Downloader<C>,
    transcoder: T,
    store: ArtifactStore,
    policy: SelectionPolicy,
    clip_format: ClipFormat,
    decoders: Arc<DecoderChain>,
}

impl<C: AsyncHttpClient, T: Transcoder> Generators<C, T> {
    /// Creates generators writing into `store`.
    pub fn new(downloader: Downloader<C>, transcoder: T, store: ArtifactStore) -> Self {
        Self {
            downloader,
            transcoder,
            store,
            policy: SelectionPolicy::default(),
            clip_format: ClipFormat::default(),
            decoders: Arc::new(DecoderChain::default()),
        }
    }

    /// Sets the rendition selection policy.
    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the animated clip container.
    pub fn with_clip_format(mut self, format: ClipFormat) -> Self {
        self.clip_format = format;
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn clip_format(&self) -> ClipFormat {
        self.clip_format
    }

    /// Runs the generator matching `request` and commits its output.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        key: &CacheKey,
        origin: Origin,
    ) -> Result<ArtifactLocation, ArtworkError> {
        match request {
            GenerationRequest::AnimatedClip { manifest_url } => {
                self.animated_clip(manifest_url, key).await
            }
            GenerationRequest::CompositeSquare { image_urls } => {
                let quality = match origin {
                    Origin::Request => SYNC_JPEG_QUALITY,
                    Origin::Queue => QUEUE_JPEG_QUALITY,
                };
                self.composite_square(image_urls, key, quality).await
            }
            GenerationRequest::ResizedCopy { image_url } => {
                self.resized_copy(image_url, key).await
            }
        }
    }

    /// Transcodes the best rendition of an HLS manifest into a looping clip.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn animated_clip(
        &self,
        manifest_url: &str,
        key: &CacheKey,
    ) -> Result<ArtifactLocation, ArtworkError> {
        let class = ArtifactClass::AnimatedClip;
        let ext = self.clip_format.extension();

        let stream_url = StreamSelector::new(&self.downloader, &self.policy)
            .select_best_rendition(manifest_url)
            .await?;

        let temp = self.store.temp_path_for(key, class, ext);
        if let Err(e) = self
            .transcoder
            .transcode(&stream_url, &temp, self.clip_format)
            .await
        {
            self.store.discard_temp(key, class, ext).await;
            return Err(e);
        }

        // ffmpeg can exit 0 without producing frames.
        let written = tokio::fs::metadata(&temp).await.map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            self.store.discard_temp(key, class, ext).await;
            return Err(ArtworkError::Transcode(format!(
                "transcoder produced no output for {}",
                stream_url
            )));
        }

        let location = self.store.promote(key, class, ext).await?;
        info!(stream = %stream_url, "Animated clip generated");
        Ok(location)
    }

    /// Builds a composite square from 2-4 images.
    #[instrument(skip(self, image_urls), fields(key = %key, images = image_urls.len()))]
    pub async fn composite_square(
        &self,
        image_urls: &[String],
        key: &CacheKey,
        quality: u8,
    ) -> Result<ArtifactLocation, ArtworkError> {
        // Reject before any network work.
        composite::layout(image_urls.len(), SQUARE_SIZE)?;

        let downloads = try_join_all(image_urls.iter().map(|u| self.downloader.fetch(u))).await?;
        let decoders = Arc::clone(&self.decoders);

        let jpeg = tokio::task::spawn_blocking(move || {
            let images = downloads
                .iter()
                .map(|d| decoders.decode(d).map(|decoded| decoded.image))
                .collect::<Result<Vec<_>, _>>()?;
            let canvas = composite::compose(&images, SQUARE_SIZE)?;
            composite::encode_jpeg(&canvas, quality)
        })
        .await
        .map_err(|e| ArtworkError::GenerationFailed(format!("composite task failed: {}", e)))??;

        self.store
            .commit(key, ArtifactClass::CompositeSquare, "jpg", &jpeg)
            .await
    }

    /// Resizes one image to 1024×1024 in its original format.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn resized_copy(
        &self,
        image_url: &str,
        key: &CacheKey,
    ) -> Result<ArtifactLocation, ArtworkError> {
        let download: Download = self.downloader.fetch(image_url).await?;
        let decoders = Arc::clone(&self.decoders);

        let (bytes, ext) = tokio::task::spawn_blocking(move || {
            let decoded = decoders.decode(&download)?;
            resize::resized_copy(&decoded)
        })
        .await
        .map_err(|e| ArtworkError::GenerationFailed(format!("resize task failed: {}", e)))??;

        self.store
            .commit(key, ArtifactClass::ResizedCopy, ext, &bytes)
            .await
    }
}
