//! Per-key single-flight request coalescing.
//!
//! When several callers ask for the same resource (the same hazard layer,
//! the same photo URL) before the first fetch completes, only one fetch
//! actually runs; every other caller subscribes to its result. This closes
//! the check-then-fetch window where naive cache-miss handling issues
//! duplicate network requests.
//!
//! # Implementation
//!
//! A `HashMap<K, broadcast::Sender<V>>` tracks in-flight keys. The first
//! caller to register becomes the leader and receives a [`LeaderGuard`]
//! owning the map entry; later callers receive a broadcast receiver to wait
//! on. The guard delivers the result via [`LeaderGuard::complete`] - and if
//! the leader future is dropped mid-flight (timeout, `select!`, dismissed
//! caller), dropping the guard removes the entry and closes the channel, so
//! followers observe the abandonment and the next caller for the key starts
//! fresh instead of waiting on a leader that no longer exists.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

/// Single-flight table keyed by resource identity.
///
/// `V` must be `Clone` so one result can be delivered to every waiter.
pub struct Coalescer<K, V> {
    /// In-flight work: key -> broadcast sender for the result
    in_flight: Mutex<HashMap<K, broadcast::Sender<V>>>,
    /// Statistics
    stats: Mutex<CoalescerStats>,
}

/// Statistics for monitoring coalescing effectiveness.
#[derive(Debug, Default, Clone)]
pub struct CoalescerStats {
    /// Total requests received
    pub total_requests: u64,
    /// Requests that waited for existing work
    pub coalesced_requests: u64,
    /// Requests that triggered new work
    pub new_requests: u64,
}

/// Outcome of registering a request.
pub enum Flight<'a, K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    /// First request for the key; the caller must do the work and resolve
    /// the guard.
    Leader(LeaderGuard<'a, K, V>),
    /// Work already in flight; wait on this receiver for the shared result.
    Follower(broadcast::Receiver<V>),
}

impl<'a, K, V> Flight<'a, K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    /// Returns true if the caller is responsible for doing the work.
    pub fn is_leader(&self) -> bool {
        matches!(self, Self::Leader(_))
    }

    /// Waits for the shared result if this is a follower.
    ///
    /// Returns `None` for a leader, or if the leader was dropped without
    /// completing (the caller should then treat the fetch as failed; a
    /// later request for the key becomes a fresh leader).
    pub async fn wait(self) -> Option<V> {
        match self {
            Self::Follower(mut rx) => rx.recv().await.ok(),
            Self::Leader(_) => None,
        }
    }
}

/// Ownership of one in-flight key.
///
/// Held by the leader for the duration of its work. [`complete`] delivers
/// the result to every follower; dropping the guard without completing
/// removes the entry and closes the channel, releasing the key.
///
/// [`complete`]: LeaderGuard::complete
pub struct LeaderGuard<'a, K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    coalescer: &'a Coalescer<K, V>,
    key: Option<K>,
}

impl<K, V> LeaderGuard<'_, K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    /// Completes the work, delivering `value` to all waiters.
    ///
    /// Call on success and on (cloneable) failure alike, so followers never
    /// hang.
    pub fn complete(mut self, value: V) {
        if let Some(key) = self.key.take() {
            self.coalescer.finish(&key, Some(value));
        }
    }
}

impl<K, V> Drop for LeaderGuard<'_, K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            debug!(key = ?key, "leader abandoned, releasing in-flight key");
            self.coalescer.finish(&key, None);
        }
    }
}

impl<K, V> Coalescer<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    /// Creates an empty coalescer.
    pub fn new() -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
            stats: Mutex::new(CoalescerStats::default()),
        }
    }

    /// Registers a request for `key`.
    pub fn register(&self, key: K) -> Flight<'_, K, V> {
        let mut in_flight = self.in_flight.lock().unwrap();
        let mut stats = self.stats.lock().unwrap();

        stats.total_requests += 1;

        if let Some(tx) = in_flight.get(&key) {
            stats.coalesced_requests += 1;
            debug!(key = ?key, "coalescing request onto in-flight work");
            Flight::Follower(tx.subscribe())
        } else {
            // Capacity 16: the typical case is a handful of concurrent
            // requests for the same key.
            let (tx, _rx) = broadcast::channel(16);
            in_flight.insert(key.clone(), tx);
            stats.new_requests += 1;
            Flight::Leader(LeaderGuard {
                coalescer: self,
                key: Some(key),
            })
        }
    }

    /// Removes the entry for `key`, broadcasting `value` if one was
    /// produced. Called only through the leader guard.
    fn finish(&self, key: &K, value: Option<V>) {
        let mut in_flight = self.in_flight.lock().unwrap();

        if let Some(tx) = in_flight.remove(key) {
            let waiters = tx.receiver_count();
            if let Some(value) = value {
                // Ignore send errors: every follower may already have gone away
                let _ = tx.send(value);
                if waiters > 0 {
                    debug!(key = ?key, waiters, "broadcast result to coalesced waiters");
                }
            }
            // With no value, dropping the sender closes the channel and
            // every follower's recv() errors out.
        }
    }

    /// Returns a snapshot of the current statistics.
    pub fn stats(&self) -> CoalescerStats {
        self.stats.lock().unwrap().clone()
    }

    /// Returns the number of currently in-flight keys.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }
}

impl<K, V> Default for Coalescer<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
