//! Per-key in-flight generation tracking.
//!
//! Prevents duplicate generation of the same artifact. When several requests
//! arrive for the same key while it is being generated, only the first
//! (the leader) starts work; the rest subscribe to the leader's result.
//!
//! # Architecture
//!
//! ```text
//! Request A ─┐
//!            │                          Generation
//! Request B ─┼──► InFlightMap ─────────► task
//!            │        │                    │
//! Request C ─┘        │                    │
//!                     ▼                    ▼
//!               [A, B, C all          [one run]
//!                receive same             │
//!                result]◄────────────────┘
//! ```
//!
//! # Implementation
//!
//! A `DashMap<(class, key), broadcast::Sender>` tracks in-flight work, so
//! distinct keys never contend on a shared lock. The leader holds a
//! [`LeaderTicket`]; completing the ticket removes the entry and broadcasts
//! the result. Dropping the ticket without completing it (a panicking task)
//! also removes the entry, and waiters observe a closed channel.

use crate::error::ArtworkError;
use crate::key::CacheKey;
use crate::store::{ArtifactClass, ArtifactLocation};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Result shared with every waiter of one generation.
pub type GenerationResult = Result<ArtifactLocation, ArtworkError>;

/// One message per generation; a little headroom costs nothing.
const COMPLETION_CHANNEL_CAPACITY: usize = 4;

type Slot = (ArtifactClass, CacheKey);

/// Statistics for monitoring coalescing effectiveness.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InFlightStats {
    /// Total registrations
    pub total_requests: u64,
    /// Registrations that joined existing work
    pub coalesced_requests: u64,
    /// Registrations that started new work
    pub new_requests: u64,
}

impl InFlightStats {
    /// Returns the coalescing ratio (0.0 to 1.0)
    pub fn coalescing_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.coalesced_requests as f64 / self.total_requests as f64
        }
    }
}

#[derive(Default)]
struct Counters {
    total: AtomicU64,
    coalesced: AtomicU64,
    new: AtomicU64,
}

/// Concurrent map of in-flight generations.
#[derive(Clone, Default)]
pub struct InFlightMap {
    in_flight: Arc<DashMap<Slot, broadcast::Sender<GenerationResult>>>,
    counters: Arc<Counters>,
}

/// Outcome of registering interest in a key.
pub enum Registration {
    /// No generation was running; the caller must run it and complete the ticket.
    Leader(LeaderTicket),
    /// A generation is already running; wait on this receiver.
    Follower(broadcast::Receiver<GenerationResult>),
}

impl Registration {
    /// Returns true if this registration started new work.
    pub fn is_leader(&self) -> bool {
        matches!(self, Self::Leader(_))
    }
}

impl InFlightMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in `(class, key)`.
    pub fn register(&self, class: ArtifactClass, key: &CacheKey) -> Registration {
        self.counters.total.fetch_add(1, Ordering::Relaxed);
        let slot = (class, key.clone());

        match self.in_flight.entry(slot.clone()) {
            Entry::Occupied(entry) => {
                let coalesced = self.counters.coalesced.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(
                    key = %key,
                    class = %class,
                    coalesced,
                    "Coalescing request - waiting for in-flight generation"
                );
                Registration::Follower(entry.get().subscribe())
            }
            Entry::Vacant(entry) => {
                let (tx, _rx) = broadcast::channel(COMPLETION_CHANNEL_CAPACITY);
                entry.insert(tx.clone());
                self.counters.new.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, class = %class, "New request - starting generation");
                Registration::Leader(LeaderTicket {
                    map: Arc::clone(&self.in_flight),
                    slot: Some(slot),
                    sender: tx,
                })
            }
        }
    }

    /// Returns true if `(class, key)` is currently being generated.
    #[cfg(test)]
    pub fn is_in_flight(&self, class: ArtifactClass, key: &CacheKey) -> bool {
        self.in_flight.contains_key(&(class, key.clone()))
    }

    /// Returns the number of in-flight generations.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Returns a snapshot of the current statistics.
    pub fn stats(&self) -> InFlightStats {
        InFlightStats {
            total_requests: self.counters.total.load(Ordering::Relaxed),
            coalesced_requests: self.counters.coalesced.load(Ordering::Relaxed),
            new_requests: self.counters.new.load(Ordering::Relaxed),
        }
    }

    /// Logs current statistics.
    pub fn log_stats(&self) {
        let stats = self.stats();
        info!(
            total_requests = stats.total_requests,
            coalesced = stats.coalesced_requests,
            new_requests = stats.new_requests,
            in_flight = self.in_flight_count(),
            coalescing_ratio = format!("{:.1}%", stats.coalescing_ratio() * 100.0),
            "Generation coalescing statistics"
        );
    }
}

/// Held by the leader of a generation.
pub struct LeaderTicket {
    map: Arc<DashMap<Slot, broadcast::Sender<GenerationResult>>>,
    slot: Option<Slot>,
    sender: broadcast::Sender<GenerationResult>,
}

impl LeaderTicket {
    /// Subscribes to this generation's result.
    pub fn subscribe(&self) -> broadcast::Receiver<GenerationResult> {
        self.sender.subscribe()
    }

    /// Removes the in-flight marker and broadcasts `result` to all waiters.
    pub fn complete(mut self, result: GenerationResult) {
        if let Some(slot) = self.slot.take() {
            self.map.remove(&slot);
            let waiters = self.sender.receiver_count();
            // Receivers may all have timed out and gone away.
            let _ = self.sender.send(result);
            debug!(key = %slot.1, class = %slot.0, waiters, "Broadcast generation result");
        }
    }
}

impl Drop for LeaderTicket {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            self.map.remove(&slot);
            debug!(key = %slot.1, class = %slot.0, "Generation abandoned without result");
        }
    }
}

/// Waits for a broadcast result.
///
/// A closed channel means the leader went away without completing, which is
/// reported as a generation failure.
pub async fn recv_result(mut rx: broadcast::Receiver<GenerationResult>) -> GenerationResult {
    match rx.recv().await {
        Ok(result) => result,
        Err(_) => Err(ArtworkError::GenerationFailed(
            "generation ended without a result".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::derive_key;
    use std::path::PathBuf;

    fn location(key: &CacheKey) -> ArtifactLocation {
        ArtifactLocation {
            key: key.clone(),
            class: ArtifactClass::AnimatedClip,
            extension: "gif".into(),
            path: PathBuf::from(format!("/cache/animated-art/{}.gif", key)),
        }
    }

    #[test]
    fn test_first_request_is_leader() {
        let map = InFlightMap::new();
        let key = derive_key("a");

        assert!(map.register(ArtifactClass::AnimatedClip, &key).is_leader());
    }

    #[test]
    fn test_second_request_is_coalesced() {
        let map = InFlightMap::new();
        let key = derive_key("a");

        let _first = map.register(ArtifactClass::AnimatedClip, &key);
        let second = map.register(ArtifactClass::AnimatedClip, &key);

        assert!(!second.is_leader());
    }

    #[test]
    fn test_class_is_part_of_the_slot() {
        let map = InFlightMap::new();
        let key = derive_key("same-url");

        let first = map.register(ArtifactClass::AnimatedClip, &key);
        let second = map.register(ArtifactClass::ResizedCopy, &key);

        assert!(first.is_leader());
        assert!(second.is_leader());
    }

    #[tokio::test]
    async fn test_multiple_waiters_all_receive_result() {
        let map = InFlightMap::new();
        let key = derive_key("a");

        let Registration::Leader(ticket) = map.register(ArtifactClass::AnimatedClip, &key) else {
            panic!("expected leader");
        };

        let handles: Vec<_> = (0..3)
            .map(|_| match map.register(ArtifactClass::AnimatedClip, &key) {
                Registration::Follower(rx) => tokio::spawn(recv_result(rx)),
                Registration::Leader(_) => panic!("expected follower"),
            })
            .collect();

        ticket.complete(Ok(location(&key)));

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(location(&key)));
        }
    }

    #[tokio::test]
    async fn test_failure_is_broadcast() {
        let map = InFlightMap::new();
        let key = derive_key("a");

        let Registration::Leader(ticket) = map.register(ArtifactClass::AnimatedClip, &key) else {
            panic!("expected leader");
        };
        let rx = ticket.subscribe();
        ticket.complete(Err(ArtworkError::Transcode("boom".into())));

        assert_eq!(
            recv_result(rx).await,
            Err(ArtworkError::Transcode("boom".into()))
        );
    }

    #[test]
    fn test_completion_removes_from_in_flight() {
        let map = InFlightMap::new();
        let key = derive_key("a");

        let Registration::Leader(ticket) = map.register(ArtifactClass::AnimatedClip, &key) else {
            panic!("expected leader");
        };
        assert_eq!(map.in_flight_count(), 1);
        assert!(map.is_in_flight(ArtifactClass::AnimatedClip, &key));

        ticket.complete(Ok(location(&key)));
        assert_eq!(map.in_flight_count(), 0);

        assert!(map.register(ArtifactClass::AnimatedClip, &key).is_leader());
    }

    #[tokio::test]
    async fn test_dropped_ticket_releases_key_and_fails_waiters() {
        let map = InFlightMap::new();
        let key = derive_key("a");

        let ticket = map.register(ArtifactClass::AnimatedClip, &key);
        let Registration::Follower(rx) = map.register(ArtifactClass::AnimatedClip, &key) else {
            panic!("expected follower");
        };
        drop(ticket);

        assert_eq!(map.in_flight_count(), 0);
        assert!(matches!(
            recv_result(rx).await,
            Err(ArtworkError::GenerationFailed(_))
        ));
    }

    #[test]
    fn test_stats_tracking() {
        let map = InFlightMap::new();
        let key = derive_key("a");

        let _first = map.register(ArtifactClass::AnimatedClip, &key);
        let _c1 = map.register(ArtifactClass::AnimatedClip, &key);
        let _c2 = map.register(ArtifactClass::AnimatedClip, &key);
        let _c3 = map.register(ArtifactClass::AnimatedClip, &key);

        let stats = map.stats();
        assert_eq!(stats.total_requests, 4);
        assert_eq!(stats.new_requests, 1);
        assert_eq!(stats.coalesced_requests, 3);
        assert!((stats.coalescing_ratio() - 0.75).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_concurrent_registration_has_single_leader() {
        let map = InFlightMap::new();
        let key = derive_key("a");

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let map = map.clone();
                let key = key.clone();
                tokio::spawn(async move { map.register(ArtifactClass::AnimatedClip, &key) })
            })
            .collect();

        let mut leaders = 0;
        let mut registrations = Vec::new();
        for handle in handles {
            let r = handle.await.unwrap();
            if r.is_leader() {
                leaders += 1;
            }
            registrations.push(r);
        }
        assert_eq!(leaders, 1);
    }
}
