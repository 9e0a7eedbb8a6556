//! Per-layer fetch/decode/cache of hazard polygons.

use super::geojson::decode_layer;
use super::{RiskError, RiskLayer, RiskPolygon};
use crate::config::RiskConfig;
use crate::http::{AsyncHttpClient, HttpError};
use crate::pipeline::{Coalescer, Flight};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cache of decoded hazard polygons, one entry per layer.
///
/// Each layer is fetched from `<base>/<layer-filename>` at most once while
/// an entry exists: a successful fetch (even one yielding zero polygons)
/// caches, a failed fetch leaves no entry so a later call retries.
/// Concurrent `fetch_if_needed` calls for the same layer share one
/// underlying request.
pub struct RiskLayerCache<C> {
    client: C,
    config: RiskConfig,
    /// Layer -> decoded polygons. Shared across pipeline workers.
    layers: DashMap<RiskLayer, Arc<Vec<RiskPolygon>>>,
    /// Single-flight table for in-progress fetches
    in_flight: Coalescer<RiskLayer, Result<(), RiskError>>,
}

impl<C: AsyncHttpClient> RiskLayerCache<C> {
    /// Creates an empty cache.
    pub fn new(client: C, config: RiskConfig) -> Self {
        Self {
            client,
            config,
            layers: DashMap::new(),
            in_flight: Coalescer::new(),
        }
    }

    /// URL of a layer's GeoJSON document.
    pub fn layer_url(&self, layer: RiskLayer) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            layer.file_name()
        )
    }

    /// Ensures the layer is cached, fetching and decoding it if needed.
    ///
    /// Returns immediately without network access when an entry exists.
    /// On failure the cache is left untouched (retryable) and the error is
    /// also logged; callers that only care about rendering can ignore it
    /// and re-invoke later. Cancellation abandons the fetch without caching
    /// anything.
    pub async fn fetch_if_needed(
        &self,
        layer: RiskLayer,
        cancel: &CancellationToken,
    ) -> Result<(), RiskError> {
        if self.layers.contains_key(&layer) {
            return Ok(());
        }
        if cancel.is_cancelled() {
            return Err(RiskError::Cancelled);
        }

        match self.in_flight.register(layer) {
            Flight::Leader(guard) => {
                let result = self.fetch_and_decode(layer, cancel).await;
                if let Ok(polygons) = &result {
                    self.layers.insert(layer, Arc::new(polygons.clone()));
                }
                let outcome = result.map(|_| ());
                guard.complete(outcome.clone());
                outcome
            }
            follower => match follower.wait().await {
                Some(outcome) => outcome,
                // Leader dropped before completing; its guard released the
                // key, so a later call starts a fresh fetch
                None => Err(RiskError::Http(HttpError::Request(
                    "in-flight layer fetch was abandoned".to_string(),
                ))),
            },
        }
    }

    /// Synchronous read of the cached polygons for a layer.
    ///
    /// Empty when the layer has not been fetched (or its fetch failed).
    pub fn polygons(&self, layer: RiskLayer) -> Arc<Vec<RiskPolygon>> {
        self.layers
            .get(&layer)
            .map(|entry| Arc::clone(entry.value()))
            .unwrap_or_default()
    }

    /// Returns true if a cache entry exists for the layer.
    pub fn is_cached(&self, layer: RiskLayer) -> bool {
        self.layers.contains_key(&layer)
    }

    /// Evicts all entries; subsequent `fetch_if_needed` calls re-fetch.
    pub fn clear_cache(&self) {
        self.layers.clear();
        info!("risk layer cache cleared");
    }

    async fn fetch_and_decode(
        &self,
        layer: RiskLayer,
        cancel: &CancellationToken,
    ) -> Result<Vec<RiskPolygon>, RiskError> {
        let url = self.layer_url(layer);

        let fetched = tokio::select! {
            _ = cancel.cancelled() => {
                info!(layer = %layer, "layer fetch cancelled");
                return Err(RiskError::Cancelled);
            }
            fetched = timeout(self.config.fetch_timeout, self.client.get(&url)) => fetched,
        };

        let bytes = match fetched {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                warn!(layer = %layer, url = url, error = %e, "layer fetch failed");
                return Err(e.into());
            }
            Err(_elapsed) => {
                warn!(layer = %layer, url = url, "layer fetch timed out");
                return Err(RiskError::Http(HttpError::Timeout(
                    self.config.fetch_timeout,
                )));
            }
        };

        // Decoding can be sizeable; keep it off the latency-sensitive path.
        let decoded = tokio::task::spawn_blocking(move || decode_layer(layer, &bytes))
            .await
            .map_err(|e| RiskError::Decode(format!("decode task failed: {}", e)))?;

        match &decoded {
            Ok(polygons) => {
                info!(layer = %layer, polygons = polygons.len(), "layer cached");
            }
            Err(e) => {
                warn!(layer = %layer, error = %e, "layer decode failed");
            }
        }
        decoded
    }
}
