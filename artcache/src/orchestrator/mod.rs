//! Generation orchestration.
//!
//! Guarantees at most one concurrent generation per `(class, key)` and lets
//! callers choose how long to wait for it.
//!
//! # Lifecycle
//!
//! ```text
//! Absent ──register──► InFlight ──commit──► Committed
//!                          │
//!                          └──error───► Absent (no negative caching)
//! ```
//!
//! The leader of a key spawns the generation as its own task. Callers only
//! ever wait on the task's broadcast, so a caller timing out never cancels
//! the work: the task keeps running and commits for later requests.

mod config;
mod inflight;

pub use config::{
    OrchestratorConfig, DEFAULT_MAX_CONCURRENT, DEFAULT_RETRY_BASE_DELAY, DEFAULT_SYNC_ATTEMPTS,
    DEFAULT_WAIT_TIMEOUT,
};
pub use inflight::{
    recv_result, GenerationResult, InFlightMap, InFlightStats, LeaderTicket, Registration,
};

use crate::error::ArtworkError;
use crate::key::CacheKey;
use crate::store::{ArtifactClass, ArtifactLocation, ArtifactStore};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};
use tracing::{debug, info, warn};

/// What a caller gets back from [`Orchestrator::obtain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The artifact was already in the store
    Cached(ArtifactLocation),
    /// The artifact was generated while the caller waited
    Generated(ArtifactLocation),
    /// Generation is still running; it will commit later
    Pending,
    /// Generation failed; the key is back to absent
    Failed(ArtworkError),
}

/// How a spawned generation runs.
#[derive(Debug, Clone, Copy)]
struct RunPolicy {
    attempts: u32,
    limited: bool,
}

/// Coordinates generations against the store.
#[derive(Clone)]
pub struct Orchestrator {
    store: ArtifactStore,
    in_flight: InFlightMap,
    limiter: Arc<Semaphore>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(store: ArtifactStore, config: OrchestratorConfig) -> Self {
        Self {
            store,
            in_flight: InFlightMap::new(),
            limiter: Arc::new(Semaphore::new(config.max_concurrent())),
            config,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn in_flight(&self) -> &InFlightMap {
        &self.in_flight
    }

    /// Returns the artifact for `(class, key)`, generating it if needed.
    ///
    /// Waits up to the configured timeout. On timeout the generation stays
    /// alive in the background and [`Outcome::Pending`] is returned.
    pub async fn obtain<F, Fut>(&self, key: &CacheKey, class: ArtifactClass, generate: F) -> Outcome
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GenerationResult> + Send + 'static,
    {
        self.obtain_with_timeout(key, class, self.config.wait_timeout(), generate)
            .await
    }

    /// [`obtain`](Self::obtain) with an explicit wait bound.
    pub async fn obtain_with_timeout<F, Fut>(
        &self,
        key: &CacheKey,
        class: ArtifactClass,
        wait: Duration,
        generate: F,
    ) -> Outcome
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GenerationResult> + Send + 'static,
    {
        if let Some(location) = self.store.locate(key, class).await {
            debug!(key = %key, class = %class, "Cache hit");
            return Outcome::Cached(location);
        }

        let policy = RunPolicy {
            attempts: self.config.sync_attempts(),
            limited: true,
        };
        let rx = self.start(key, class, policy, generate);

        match tokio::time::timeout(wait, recv_result(rx)).await {
            Ok(Ok(location)) => Outcome::Generated(location),
            Ok(Err(e)) => Outcome::Failed(e),
            Err(_) => {
                info!(
                    key = %key,
                    class = %class,
                    timeout_ms = wait.as_millis() as u64,
                    "Generation still running after wait timeout, detaching"
                );
                Outcome::Pending
            }
        }
    }

    /// Runs one generation attempt through the in-flight map and waits for it
    /// without a timeout.
    ///
    /// Used by queue workers, which own their retry schedule and are already
    /// bounded by the worker pool.
    pub async fn run_to_completion<F, Fut>(
        &self,
        key: &CacheKey,
        class: ArtifactClass,
        generate: F,
    ) -> GenerationResult
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GenerationResult> + Send + 'static,
    {
        let policy = RunPolicy {
            attempts: 1,
            limited: false,
        };
        recv_result(self.start(key, class, policy, generate)).await
    }

    /// Joins the in-flight generation for the slot, or spawns one.
    fn start<F, Fut>(
        &self,
        key: &CacheKey,
        class: ArtifactClass,
        policy: RunPolicy,
        generate: F,
    ) -> broadcast::Receiver<GenerationResult>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GenerationResult> + Send + 'static,
    {
        let ticket = match self.in_flight.register(class, key) {
            Registration::Follower(rx) => return rx,
            Registration::Leader(ticket) => ticket,
        };
        let rx = ticket.subscribe();

        let store = self.store.clone();
        let limiter = Arc::clone(&self.limiter);
        let base_delay = self.config.retry_base_delay();
        let key = key.clone();

        tokio::spawn(async move {
            // The previous leader may have committed between our store check
            // and registration.
            if let Some(location) = store.locate(&key, class).await {
                ticket.complete(Ok(location));
                return;
            }

            let _permit = if policy.limited {
                match limiter.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        ticket.complete(Err(ArtworkError::GenerationFailed(
                            "generation limiter closed".to_string(),
                        )));
                        return;
                    }
                }
            } else {
                None
            };

            let result = run_attempts(&key, class, policy.attempts, base_delay, &generate).await;
            match &result {
                Ok(location) => info!(
                    key = %key,
                    class = %class,
                    path = %location.path.display(),
                    "Artifact committed"
                ),
                Err(e) => warn!(key = %key, class = %class, error = %e, "Generation failed"),
            }
            ticket.complete(result);
        });

        rx
    }
}

/// Calls `generate` up to `attempts` times, backing off exponentially
/// between retryable failures.
async fn run_attempts<F, Fut>(
    key: &CacheKey,
    class: ArtifactClass,
    attempts: u32,
    base_delay: Duration,
    generate: &F,
) -> GenerationResult
where
    F: Fn() -> Fut,
    Fut: Future<Output = GenerationResult>,
{
    let mut attempt = 0;
    loop {
        match generate().await {
            Ok(location) => return Ok(location),
            Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                let delay = base_delay.saturating_mul(1 << attempt.min(16));
                debug!(
                    key = %key,
                    class = %class,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying generation"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::derive_key;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const CLASS: ArtifactClass = ArtifactClass::CompositeSquare;

    fn orchestrator(dir: &TempDir, config: OrchestratorConfig) -> Orchestrator {
        let store = ArtifactStore::open_at(dir.path()).unwrap();
        Orchestrator::new(store, config)
    }

    /// Generator that commits a JPEG-ish payload after `delay`, counting calls.
    fn committing(
        store: ArtifactStore,
        key: CacheKey,
        delay: Duration,
        calls: Arc<AtomicUsize>,
    ) -> impl Fn() -> std::pin::Pin<Box<dyn Future<Output = GenerationResult> + Send>>
           + Send
           + Sync
           + 'static {
        move || {
            let store = store.clone();
            let key = key.clone();
            let calls = Arc::clone(&calls);
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                store.commit(&key, CLASS, "jpg", b"square").await
            })
        }
    }

    #[tokio::test]
    async fn test_cache_hit_skips_generation() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(&dir, OrchestratorConfig::default());
        let key = derive_key("hit");
        orch.store().commit(&key, CLASS, "jpg", b"x").await.unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let gen = committing(orch.store().clone(), key.clone(), Duration::ZERO, calls.clone());
        let outcome = orch.obtain(&key, CLASS, gen).await;

        assert!(matches!(outcome, Outcome::Cached(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_miss_generates_then_hits() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(&dir, OrchestratorConfig::default());
        let key = derive_key("miss");
        let calls = Arc::new(AtomicUsize::new(0));

        let gen = committing(orch.store().clone(), key.clone(), Duration::ZERO, calls.clone());
        let first = orch.obtain(&key, CLASS, gen).await;
        assert!(matches!(first, Outcome::Generated(ref loc) if loc.extension == "jpg"));

        let gen = committing(orch.store().clone(), key.clone(), Duration::ZERO, calls.clone());
        let second = orch.obtain(&key, CLASS, gen).await;
        assert!(matches!(second, Outcome::Cached(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_generate_once() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(&dir, OrchestratorConfig::default());
        let key = derive_key("concurrent");
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let orch = orch.clone();
                let key = key.clone();
                let gen = committing(
                    orch.store().clone(),
                    key.clone(),
                    Duration::from_millis(100),
                    calls.clone(),
                );
                tokio::spawn(async move { orch.obtain(&key, CLASS, gen).await })
            })
            .collect();

        for handle in handles {
            let outcome = handle.await.unwrap();
            assert!(
                matches!(outcome, Outcome::Generated(_) | Outcome::Cached(_)),
                "unexpected outcome {:?}",
                outcome
            );
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(orch.in_flight().in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_timeout_detaches_and_commits_later() {
        let dir = TempDir::new().unwrap();
        let config = OrchestratorConfig::new().with_wait_timeout(Duration::from_millis(50));
        let orch = orchestrator(&dir, config);
        let key = derive_key("slow");
        let calls = Arc::new(AtomicUsize::new(0));

        let gen = committing(
            orch.store().clone(),
            key.clone(),
            Duration::from_millis(300),
            calls.clone(),
        );
        let outcome = orch.obtain(&key, CLASS, gen).await;
        assert_eq!(outcome, Outcome::Pending);
        assert!(!orch.store().exists(&key, CLASS).await);

        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(orch.store().exists(&key, CLASS).await);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(&dir, OrchestratorConfig::default());
        let key = derive_key("fails");
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let outcome = orch
            .obtain(&key, CLASS, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async {
                    Err::<ArtifactLocation, _>(ArtworkError::fetch(
                        "https://a.apple.com/x",
                        "HTTP 500",
                    ))
                }
            })
            .await;
        assert!(matches!(outcome, Outcome::Failed(ArtworkError::Fetch { .. })));
        assert_eq!(orch.in_flight().in_flight_count(), 0);

        let gen = committing(orch.store().clone(), key.clone(), Duration::ZERO, calls.clone());
        let retry = orch.obtain(&key, CLASS, gen).await;
        assert!(matches!(retry, Outcome::Generated(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_sync_attempts_retry_retryable_errors() {
        let dir = TempDir::new().unwrap();
        let config = OrchestratorConfig::new()
            .with_sync_attempts(3)
            .with_retry_base_delay(Duration::from_millis(5));
        let orch = orchestrator(&dir, config);
        let key = derive_key("flaky");
        let calls = Arc::new(AtomicUsize::new(0));

        let store = orch.store().clone();
        let counter = calls.clone();
        let k = key.clone();
        let outcome = orch
            .obtain(&key, CLASS, move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let store = store.clone();
                let k = k.clone();
                async move {
                    if n < 2 {
                        Err(ArtworkError::Transcode("transient".into()))
                    } else {
                        store.commit(&k, CLASS, "jpg", b"ok").await
                    }
                }
            })
            .await;

        assert!(matches!(outcome, Outcome::Generated(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_is_not_retried() {
        let dir = TempDir::new().unwrap();
        let config = OrchestratorConfig::new()
            .with_sync_attempts(3)
            .with_retry_base_delay(Duration::from_millis(5));
        let orch = orchestrator(&dir, config);
        let key = derive_key("bad");
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let outcome = orch
            .obtain(&key, CLASS, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<ArtifactLocation, _>(ArtworkError::UnsupportedLayout(5)) }
            })
            .await;

        assert_eq!(outcome, Outcome::Failed(ArtworkError::UnsupportedLayout(5)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_generator_releases_key() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(&dir, OrchestratorConfig::default());
        let key = derive_key("panics");

        async fn exploding() -> GenerationResult {
            panic!("generator exploded")
        }
        let outcome = orch.obtain(&key, CLASS, exploding).await;

        assert!(matches!(outcome, Outcome::Failed(ArtworkError::GenerationFailed(_))));
        assert_eq!(orch.in_flight().in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_run_to_completion_joins_in_flight_work() {
        let dir = TempDir::new().unwrap();
        let config = OrchestratorConfig::new().with_wait_timeout(Duration::from_millis(20));
        let orch = orchestrator(&dir, config);
        let key = derive_key("joined");
        let calls = Arc::new(AtomicUsize::new(0));

        let gen = committing(
            orch.store().clone(),
            key.clone(),
            Duration::from_millis(200),
            calls.clone(),
        );
        assert_eq!(orch.obtain(&key, CLASS, gen).await, Outcome::Pending);

        let gen = committing(orch.store().clone(), key.clone(), Duration::ZERO, calls.clone());
        let result = orch.run_to_completion(&key, CLASS, gen).await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
