//! Artwork service facade implementation.

use super::config::{ResponseMode, ServiceConfig, TimeoutStatus};
use super::error::ServiceError;
use super::response::{messages, public_url, ArtworkResponse};
use crate::error::ArtworkError;
use crate::generate::transcode::{FfmpegTranscoder, Transcoder};
use crate::generate::{GenerationRequest, Generators, Origin};
use crate::key::CacheKey;
use crate::manifest::SelectionPolicy;
use crate::orchestrator::{GenerationResult, Orchestrator, Outcome};
use crate::provider::{AsyncHttpClient, AsyncReqwestClient, Downloader};
use crate::queue::{JobJournal, WorkQueue, JOURNAL_DIR_NAME};
use crate::store::{ArtifactClass, ArtifactLocation, ArtifactStore, StoreError};
use crate::validate::UrlValidator;
use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Service wired with the production HTTP client and ffmpeg.
pub type DefaultArtworkService = ArtworkService<AsyncReqwestClient, FfmpegTranscoder>;

/// High-level facade for artwork generation.
///
/// Owns the store, generators, orchestrator and work queue, and turns
/// requests into [`ArtworkResponse`]s:
///
/// 1. validate the source URLs
/// 2. derive the key and answer from the store on a hit
/// 3. otherwise generate according to the configured [`ResponseMode`]
///
/// # Example
///
/// ```ignore
/// use artcache::service::{DefaultArtworkService, ServiceConfig};
/// use tokio_util::sync::CancellationToken;
///
/// let service = DefaultArtworkService::start(ServiceConfig::default(), CancellationToken::new()).await?;
/// let response = service.generate_clip("https://video.apple.com/x/master.m3u8").await;
/// println!("{} {}", response.status_code(), response.message());
/// ```
pub struct ArtworkService<C, T> {
    config: ServiceConfig,
    validator: UrlValidator,
    generators: Arc<Generators<C, T>>,
    orchestrator: Orchestrator,
    queue: WorkQueue,
    shutdown: CancellationToken,
}

impl DefaultArtworkService {
    /// Creates the production service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the cache
    /// directories cannot be created.
    pub async fn start(
        config: ServiceConfig,
        shutdown: CancellationToken,
    ) -> Result<Self, ServiceError> {
        let client =
            AsyncReqwestClient::with_timeout(config.http_timeout_secs(), config.max_body_bytes())?;
        let transcoder =
            FfmpegTranscoder::new(config.ffmpeg_binary().clone(), config.ffmpeg_threads());

        let probe = transcoder.clone();
        let available = tokio::task::spawn_blocking(move || probe.is_available())
            .await
            .unwrap_or(false);
        if !available {
            warn!(
                binary = %config.ffmpeg_binary().display(),
                "ffmpeg not found; animated clip generation will fail"
            );
        }

        Self::with_components(config, client, transcoder, shutdown).await
    }
}

impl<C, T> ArtworkService<C, T>
where
    C: AsyncHttpClient + 'static,
    T: Transcoder + 'static,
{
    /// Wires the service around the given HTTP client and transcoder.
    pub async fn with_components(
        config: ServiceConfig,
        client: C,
        transcoder: T,
        shutdown: CancellationToken,
    ) -> Result<Self, ServiceError> {
        let store = ArtifactStore::open_at(config.cache_directory())
            .map_err(|e| ServiceError::cache_directory(config.cache_directory(), e))?;
        if let Err(e) = store.sweep_temp() {
            warn!(error = %e, "Failed to sweep temporary files");
        }

        let downloader = Downloader::new(client, config.download().clone());
        let generators = Arc::new(
            Generators::new(downloader, transcoder, store.clone())
                .with_policy(SelectionPolicy::new(config.min_width()))
                .with_clip_format(config.clip_format()),
        );
        let orchestrator = Orchestrator::new(store.clone(), config.orchestrator().clone());
        let journal = JobJournal::under_root(store.root()).map_err(|e| {
            ServiceError::cache_directory(store.root().join(JOURNAL_DIR_NAME), e)
        })?;
        let queue = WorkQueue::start(
            Arc::clone(&generators),
            orchestrator.clone(),
            config.queue().clone(),
            Some(journal),
            shutdown.clone(),
        )
        .await;

        info!(
            cache_dir = %store.root().display(),
            mode = %config.mode(),
            timeout_status = %config.timeout_status(),
            wait_timeout_secs = config.orchestrator().wait_timeout().as_secs(),
            clip_format = %config.clip_format().extension(),
            published_uri = %config.published_uri(),
            "Artwork service started"
        );

        Ok(Self {
            validator: UrlValidator::new(config.allowed_domains()),
            config,
            generators,
            orchestrator,
            queue,
            shutdown,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        self.orchestrator.store()
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    /// Stops the work queue and logs coalescing statistics.
    ///
    /// Unfinished jobs stay journaled.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.orchestrator.in_flight().log_stats();
    }

    /// Animated clip from an HLS manifest.
    pub async fn generate_clip(&self, manifest_url: &str) -> ArtworkResponse {
        self.handle(GenerationRequest::AnimatedClip {
            manifest_url: manifest_url.to_string(),
        })
        .await
    }

    /// Composite square from 2-4 images.
    pub async fn generate_square(&self, image_urls: Vec<String>) -> ArtworkResponse {
        self.handle(GenerationRequest::CompositeSquare { image_urls })
            .await
    }

    /// 1024×1024 copy of one image.
    pub async fn generate_resized(&self, image_url: &str) -> ArtworkResponse {
        self.handle(GenerationRequest::ResizedCopy {
            image_url: image_url.to_string(),
        })
        .await
    }

    /// Answers a generation request according to the configured mode.
    #[instrument(skip(self, request), fields(class = %request.class()))]
    pub async fn handle(&self, request: GenerationRequest) -> ArtworkResponse {
        if let Err(e) = self.validator.validate_request(&request) {
            return ArtworkResponse::Invalid {
                message: client_message(e),
            };
        }

        let key = request.key();
        let class = request.class();

        if let Some(location) = self.store().locate(&key, class).await {
            return self.ready(location, true);
        }

        match self.config.mode() {
            ResponseMode::Wait => {
                let outcome = self
                    .orchestrator
                    .obtain(&key, class, self.generator(request))
                    .await;
                match outcome {
                    Outcome::Cached(location) => self.ready(location, true),
                    Outcome::Generated(location) => self.ready(location, false),
                    Outcome::Pending => self.timed_out(key, class),
                    Outcome::Failed(error) => self.failed(key, class, error),
                }
            }
            ResponseMode::QueueWait => match self.queue.enqueue(request).await {
                Ok(mut handle) => {
                    let wait = self.config.orchestrator().wait_timeout();
                    match tokio::time::timeout(wait, handle.wait()).await {
                        Ok(Ok(location)) => self.ready(location, false),
                        Ok(Err(error)) => self.failed(key, class, error),
                        Err(_) => self.timed_out(key, class),
                    }
                }
                Err(e) => self.failed(key, class, ArtworkError::GenerationFailed(e.to_string())),
            },
            ResponseMode::QueueDeferred => match self.queue.enqueue(request).await {
                Ok(_) => self.pending(key, class),
                Err(e) => self.failed(key, class, ArtworkError::GenerationFailed(e.to_string())),
            },
        }
    }

    /// Validates and generates without a wait bound.
    ///
    /// Used by one-shot tooling that wants the artifact or the error.
    pub async fn generate_to_completion(
        &self,
        request: GenerationRequest,
    ) -> Result<ArtifactLocation, ArtworkError> {
        self.validator.validate_request(&request)?;
        let key = request.key();
        let class = request.class();
        if let Some(location) = self.store().locate(&key, class).await {
            return Ok(location);
        }
        self.orchestrator
            .run_to_completion(&key, class, self.generator(request))
            .await
    }

    /// Reads a committed artifact, optionally with an exact extension.
    pub async fn open(
        &self,
        class: ArtifactClass,
        key: &CacheKey,
        extension: Option<&str>,
    ) -> Result<(ArtifactLocation, Bytes), StoreError> {
        match extension {
            Some(ext) => self.store().open_with_extension(key, class, ext).await,
            None => self.store().open(key, class).await,
        }
    }

    /// Public link for an artifact.
    pub fn public_url(&self, class: ArtifactClass, key: &CacheKey, ext: Option<&str>) -> String {
        public_url(self.config.published_uri(), class, key, ext)
    }

    fn generator(
        &self,
        request: GenerationRequest,
    ) -> impl Fn() -> BoxFuture<'static, GenerationResult> + Send + Sync + 'static {
        let generators = Arc::clone(&self.generators);
        move || {
            let generators = Arc::clone(&generators);
            let request = request.clone();
            async move {
                let key = request.key();
                generators.generate(&request, &key, Origin::Request).await
            }
            .boxed()
        }
    }

    fn ready(&self, location: ArtifactLocation, cached: bool) -> ArtworkResponse {
        let wording = messages(location.class);
        let url = self.public_url(location.class, &location.key, Some(&location.extension));
        ArtworkResponse::Ready {
            key: location.key.clone(),
            message: if cached {
                wording.exists
            } else {
                wording.generated
            },
            url,
            location,
            cached,
        }
    }

    fn pending(&self, key: CacheKey, class: ArtifactClass) -> ArtworkResponse {
        ArtworkResponse::Pending {
            url: self.public_url(class, &key, self.expected_extension(class)),
            message: messages(class).pending,
            key,
        }
    }

    fn timed_out(&self, key: CacheKey, class: ArtifactClass) -> ArtworkResponse {
        match self.config.timeout_status() {
            TimeoutStatus::Accepted => self.pending(key, class),
            TimeoutStatus::Error => ArtworkResponse::TimedOut {
                message: messages(class).timed_out,
                key,
            },
        }
    }

    fn failed(&self, key: CacheKey, class: ArtifactClass, error: ArtworkError) -> ArtworkResponse {
        warn!(key = %key, class = %class, error = %error, "Artwork generation failed");
        ArtworkResponse::Failed {
            message: messages(class).failed,
            key,
            error,
        }
    }

    /// Extension a not-yet-committed artifact will have, if it is fixed.
    fn expected_extension(&self, class: ArtifactClass) -> Option<&'static str> {
        match class {
            ArtifactClass::AnimatedClip => Some(self.config.clip_format().extension()),
            ArtifactClass::CompositeSquare => Some("jpg"),
            ArtifactClass::ResizedCopy => None,
        }
    }
}

/// Message shown to clients for a rejected request.
fn client_message(error: ArtworkError) -> String {
    match error {
        ArtworkError::Validation(message) => message,
        other => other.to_string(),
    }
}
