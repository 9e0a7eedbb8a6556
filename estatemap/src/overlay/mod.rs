//! Map overlay diffing and listing annotation sync.
//!
//! Overlay rebuilds are expensive: each pass can issue many add/remove
//! calls against the renderer, and the hosting view re-renders on every
//! unrelated state change. [`OverlayDiffEngine`] compares the active layer
//! configuration against the previous pass and skips the whole rebuild
//! when nothing changed.

mod annotations;
mod diff;

pub use annotations::AnnotationSync;
pub use diff::{OverlayDiffEngine, OverlaySnapshot, SyncOutcome};

use crate::coord::Coordinate;
use crate::http::AsyncHttpClient;
use crate::record::ListingId;
use crate::risk::{RiskLayer, RiskLayerCache, RiskPolygon};
use std::sync::Arc;

/// The add/remove contract a map renderer exposes.
///
/// The diff engine and annotation sync only ever call these; renderer
/// internals (tile drawing, pin styling) stay out of scope.
pub trait MapRenderer {
    /// Adds the raster tile overlay for a layer.
    fn add_tile_overlay(&mut self, layer: RiskLayer);

    /// Removes the raster tile overlay for a layer.
    fn remove_tile_overlay(&mut self, layer: RiskLayer);

    /// Adds one hazard polygon overlay.
    fn add_polygon_overlay(&mut self, polygon: &RiskPolygon);

    /// Removes every polygon overlay belonging to a layer.
    fn remove_polygon_overlays(&mut self, layer: RiskLayer);

    /// Adds a point marker for a listing.
    fn add_annotation(&mut self, id: ListingId, coordinate: Coordinate);

    /// Removes a listing's point marker.
    fn remove_annotation(&mut self, id: ListingId);
}

/// Read side of the hazard polygon cache, as seen by the diff engine.
pub trait PolygonSource {
    /// Cached polygons for a layer; empty when not (yet) fetched.
    fn polygons(&self, layer: RiskLayer) -> Arc<Vec<RiskPolygon>>;
}

impl<C: AsyncHttpClient> PolygonSource for RiskLayerCache<C> {
    fn polygons(&self, layer: RiskLayer) -> Arc<Vec<RiskPolygon>> {
        RiskLayerCache::polygons(self, layer)
    }
}
