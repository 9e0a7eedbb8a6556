//! Batch address resolution under a provider admission cap.
//!
//! For every listing that still lacks a coordinate, the resolver issues one
//! geocode call. At most `max_concurrent` calls (default 2) are outstanding
//! at any instant; after each success the worker slot stays occupied for a
//! cooldown so a batch respects the provider's ~1 req/sec ceiling.
//!
//! Successful coordinates are funneled through an mpsc channel into one
//! writer task - the only place that mutates the record store during a
//! batch. Failures are tallied and never abort sibling calls. Committing
//! the updated records afterwards is the caller's job.

use super::Geocoder;
use crate::config::GeocodeConfig;
use crate::coord::Coordinate;
use crate::pipeline::ConcurrencyLimiter;
use crate::record::{AddressQuery, ListingId, RecordStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Batch geocoder for listing records.
pub struct AddressResolver<G> {
    geocoder: Arc<G>,
    config: GeocodeConfig,
}

impl<G: Geocoder + 'static> AddressResolver<G> {
    /// Creates a resolver over the given provider.
    pub fn new(geocoder: G, config: GeocodeConfig) -> Self {
        Self {
            geocoder: Arc::new(geocoder),
            config,
        }
    }

    /// Resolves every listing in the store that has a non-empty address and
    /// no coordinate yet.
    ///
    /// Returns the number of addresses that could not be resolved. Listings
    /// with empty addresses are skipped and not counted as attempts.
    pub async fn resolve_pending(
        &self,
        store: &Arc<dyn RecordStore>,
        cancel: CancellationToken,
    ) -> usize {
        let queries = AddressQuery::pending(store.as_ref());
        self.resolve_batch(queries, store, cancel).await
    }

    /// Resolves an explicit batch of address queries.
    ///
    /// # Arguments
    ///
    /// * `queries` - Work units, one per unresolved listing
    /// * `store` - Record store receiving coordinate writes
    /// * `cancel` - Stops admission and abandons in-flight calls when fired
    ///
    /// # Returns
    ///
    /// The count of attempted queries that failed (provider error, empty
    /// result, or timeout). Cancelled units are skipped, not failed.
    pub async fn resolve_batch(
        &self,
        queries: Vec<AddressQuery>,
        store: &Arc<dyn RecordStore>,
        cancel: CancellationToken,
    ) -> usize {
        if queries.is_empty() {
            return 0;
        }

        let total = queries.len();
        let limiter = Arc::new(ConcurrencyLimiter::new(
            self.config.max_concurrent,
            "geocode",
        ));
        let failures = Arc::new(AtomicUsize::new(0));

        // Single designated writer: every coordinate write goes through
        // this task, workers never touch the store directly.
        let (write_tx, mut write_rx) = mpsc::unbounded_channel::<(ListingId, Coordinate)>();
        let writer_store = Arc::clone(store);
        let writer = tokio::spawn(async move {
            let mut applied = 0usize;
            while let Some((id, coordinate)) = write_rx.recv().await {
                writer_store.set_coordinate(id, coordinate);
                applied += 1;
            }
            applied
        });

        let mut handles = Vec::with_capacity(total);
        for query in queries {
            if cancel.is_cancelled() {
                break;
            }

            let geocoder = Arc::clone(&self.geocoder);
            let limiter = Arc::clone(&limiter);
            let failures = Arc::clone(&failures);
            let write_tx = write_tx.clone();
            let cancel = cancel.clone();
            let call_timeout = self.config.call_timeout;
            let cooldown = self.config.success_cooldown;

            handles.push(tokio::spawn(async move {
                let _permit = tokio::select! {
                    permit = limiter.acquire() => permit,
                    _ = cancel.cancelled() => return,
                };

                let outcome = tokio::select! {
                    outcome = timeout(call_timeout, geocoder.resolve(&query.address)) => outcome,
                    _ = cancel.cancelled() => return,
                };

                match outcome {
                    Ok(Ok(Some(coordinate))) => {
                        debug!(
                            listing = query.id.0,
                            coordinate = %coordinate,
                            "address resolved"
                        );
                        let _ = write_tx.send((query.id, coordinate));
                        // Hold the permit through the cooldown so the next
                        // admission waits out the provider rate limit.
                        tokio::time::sleep(cooldown).await;
                    }
                    Ok(Ok(None)) => {
                        debug!(listing = query.id.0, "address not found by provider");
                        failures.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(Err(e)) => {
                        warn!(listing = query.id.0, error = %e, "geocode call failed");
                        failures.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(_elapsed) => {
                        warn!(
                            listing = query.id.0,
                            timeout = ?call_timeout,
                            "geocode call timed out"
                        );
                        failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }));
        }

        for handle in handles {
            // Worker tasks neither panic nor get aborted; join errors would
            // indicate a bug, so surface them as failures rather than hang.
            if handle.await.is_err() {
                failures.fetch_add(1, Ordering::Relaxed);
            }
        }

        // All workers done: close the channel and let the writer drain.
        drop(write_tx);
        let applied = writer.await.unwrap_or(0);

        let failed = failures.load(Ordering::Relaxed);
        info!(
            total,
            applied,
            failed,
            peak_in_flight = limiter.peak_in_flight(),
            "geocode batch finished"
        );
        failed
    }
}
