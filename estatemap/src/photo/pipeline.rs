//! Photo acquisition pipeline: memory, disk, then network.

use super::{trim_whitespace_border, Photo, PhotoDiskCache, PhotoError, PhotoMemoryCache};
use crate::config::PhotoConfig;
use crate::http::{AsyncHttpClient, HttpError};
use crate::pipeline::{Coalescer, Flight};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Counters for the photo pipeline.
#[derive(Debug, Default)]
struct PhotoStats {
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    network_fetches: AtomicU64,
    failures: AtomicU64,
}

/// Point-in-time view of the pipeline counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoStatsSnapshot {
    /// Requests served from the memory tier
    pub memory_hits: u64,
    /// Requests served from the disk tier
    pub disk_hits: u64,
    /// Requests that went to the network
    pub network_fetches: u64,
    /// Requests that ended in an error
    pub failures: u64,
    /// Memory tier evictions
    pub evictions: u64,
}

/// Fetches listing photos through a two-tier cache.
///
/// Lookup order is memory, disk, network. A photo fetched from the network
/// is decoded and border-trimmed off the async runtime, then stored in
/// both tiers; the disk write happens off the request path. Concurrent
/// requests for the same URL are coalesced into a single fetch.
pub struct PhotoPipeline<C> {
    client: C,
    config: PhotoConfig,
    memory: PhotoMemoryCache,
    disk: Arc<PhotoDiskCache>,
    in_flight: Coalescer<String, Result<Arc<Photo>, PhotoError>>,
    stats: PhotoStats,
}

impl<C: AsyncHttpClient> PhotoPipeline<C> {
    /// Creates a pipeline, opening (and if needed creating) the disk cache
    /// directory from the config.
    pub fn new(client: C, config: PhotoConfig) -> Result<Self, PhotoError> {
        let disk = Arc::new(PhotoDiskCache::new(config.cache_dir.clone())?);
        Ok(Self {
            client,
            memory: PhotoMemoryCache::new(config.memory_max_bytes),
            disk,
            config,
            in_flight: Coalescer::new(),
            stats: PhotoStats::default(),
        })
    }

    /// Memory tier, exposed for inspection.
    pub fn memory(&self) -> &PhotoMemoryCache {
        &self.memory
    }

    /// Disk tier, exposed for inspection.
    pub fn disk(&self) -> &PhotoDiskCache {
        &self.disk
    }

    /// Returns a snapshot of the pipeline counters.
    pub fn stats(&self) -> PhotoStatsSnapshot {
        PhotoStatsSnapshot {
            memory_hits: self.stats.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.stats.disk_hits.load(Ordering::Relaxed),
            network_fetches: self.stats.network_fetches.load(Ordering::Relaxed),
            failures: self.stats.failures.load(Ordering::Relaxed),
            evictions: self.memory.evictions(),
        }
    }

    /// Fetches the photo for `url`.
    ///
    /// Every error is per-request: a failed photo never poisons the cache,
    /// and a later request for the same URL starts over. Decode failures
    /// are terminal for the request; there is no retry within it.
    pub async fn fetch(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Arc<Photo>, PhotoError> {
        if cancel.is_cancelled() {
            return Err(PhotoError::Cancelled);
        }

        if let Some(photo) = self.memory.get(url) {
            self.stats.memory_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(photo);
        }

        let guard = match self.in_flight.register(url.to_string()) {
            Flight::Leader(guard) => guard,
            follower => {
                return match follower.wait().await {
                    Some(result) => result,
                    // Leader dropped before completing; its guard released
                    // the key, so a later request starts a fresh fetch
                    None => Err(PhotoError::Io(
                        "in-flight photo fetch was abandoned".to_string(),
                    )),
                };
            }
        };

        let result = self.fetch_uncached(url, cancel).await;
        if result.is_err() {
            self.stats.failures.fetch_add(1, Ordering::Relaxed);
        }
        guard.complete(result.clone());
        result
    }

    /// Disk-then-network path, run only by the coalescing leader.
    async fn fetch_uncached(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Arc<Photo>, PhotoError> {
        let disk = Arc::clone(&self.disk);
        let key = url.to_string();
        let cached = tokio::task::spawn_blocking(move || disk.read(&key))
            .await
            .map_err(|e| PhotoError::Io(format!("disk read task failed: {e}")))??;

        if let Some(photo) = cached {
            let photo = Arc::new(photo);
            self.memory.put(url.to_string(), Arc::clone(&photo));
            self.stats.disk_hits.fetch_add(1, Ordering::Relaxed);
            debug!(url, "photo served from disk cache");
            return Ok(photo);
        }

        self.stats.network_fetches.fetch_add(1, Ordering::Relaxed);
        let bytes = tokio::select! {
            _ = cancel.cancelled() => return Err(PhotoError::Cancelled),
            fetched = timeout(self.config.fetch_timeout, self.client.get(url)) => {
                match fetched {
                    Ok(result) => result?,
                    Err(_) => {
                        return Err(PhotoError::Http(HttpError::Timeout(
                            self.config.fetch_timeout,
                        )))
                    }
                }
            }
        };

        // Decode and trim on the blocking pool; large JPEGs take long
        // enough to stall the runtime otherwise.
        let photo = tokio::task::spawn_blocking(move || {
            let decoded = image::load_from_memory(&bytes)
                .map_err(|e| PhotoError::Decode(e.to_string()))?;
            Ok::<Photo, PhotoError>(trim_whitespace_border(&Photo::new(decoded.to_rgba8())))
        })
        .await
        .map_err(|e| PhotoError::Decode(format!("decode task failed: {e}")))??;

        let (width, height) = photo.dimensions();
        debug!(url, width, height, "photo fetched and trimmed");

        let photo = Arc::new(photo);
        self.memory.put(url.to_string(), Arc::clone(&photo));

        // Persist off the request path; a failed write only costs a
        // re-fetch next session.
        let disk = Arc::clone(&self.disk);
        let key = url.to_string();
        let to_write = Arc::clone(&photo);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = disk.write(&key, &to_write) {
                warn!(url = %key, error = %e, "photo disk write failed");
            }
        });

        Ok(photo)
    }

    /// Empties both cache tiers.
    pub async fn clear_cache(&self) -> Result<(), PhotoError> {
        self.memory.clear();
        let disk = Arc::clone(&self.disk);
        tokio::task::spawn_blocking(move || disk.clear())
            .await
            .map_err(|e| PhotoError::Io(format!("disk clear task failed: {e}")))?
    }
}
