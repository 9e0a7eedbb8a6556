//! Listing pin synchronization.
//!
//! Keeps the renderer's point markers in step with the listing set using
//! minimal add/remove calls: pins are added for newly geocoded listings
//! and removed for listings that disappeared from the set.

use super::MapRenderer;
use crate::record::{Listing, ListingId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Tracks which listing pins are currently on the renderer.
#[derive(Debug, Default)]
pub struct AnnotationSync {
    shown: BTreeSet<ListingId>,
}

impl AnnotationSync {
    /// Creates a sync with no pins tracked.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pins currently tracked.
    pub fn shown_count(&self) -> usize {
        self.shown.len()
    }

    /// Reconciles the renderer's pins with the given listings.
    ///
    /// Only listings that already have a coordinate get a pin; unresolved
    /// ones are picked up on the pass after their geocode succeeds.
    pub fn sync<R: MapRenderer>(&mut self, renderer: &mut R, listings: &[Listing]) {
        let desired: BTreeMap<ListingId, _> = listings
            .iter()
            .filter_map(|listing| listing.coordinate.map(|c| (listing.id, c)))
            .collect();

        let stale: Vec<ListingId> = self
            .shown
            .iter()
            .filter(|id| !desired.contains_key(id))
            .copied()
            .collect();
        for id in stale {
            renderer.remove_annotation(id);
            self.shown.remove(&id);
        }

        let mut added = 0;
        for (id, coordinate) in &desired {
            if self.shown.insert(*id) {
                renderer.add_annotation(*id, *coordinate);
                added += 1;
            }
        }

        if added > 0 {
            debug!(added, shown = self.shown.len(), "listing pins updated");
        }
    }

    /// Removes every tracked pin from the renderer.
    pub fn clear<R: MapRenderer>(&mut self, renderer: &mut R) {
        for id in &self.shown {
            renderer.remove_annotation(*id);
        }
        self.shown.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Coordinate;
    use crate::risk::{RiskLayer, RiskPolygon};

    #[derive(Default)]
    struct RecordingRenderer {
        calls: Vec<String>,
    }

    impl MapRenderer for RecordingRenderer {
        fn add_tile_overlay(&mut self, _layer: RiskLayer) {}
        fn remove_tile_overlay(&mut self, _layer: RiskLayer) {}
        fn add_polygon_overlay(&mut self, _polygon: &RiskPolygon) {}
        fn remove_polygon_overlays(&mut self, _layer: RiskLayer) {}

        fn add_annotation(&mut self, id: ListingId, _coordinate: Coordinate) {
            self.calls.push(format!("add:{}", id.0));
        }

        fn remove_annotation(&mut self, id: ListingId) {
            self.calls.push(format!("remove:{}", id.0));
        }
    }

    fn geocoded(id: u64) -> Listing {
        let mut listing = Listing::new(ListingId(id), "addr");
        listing.coordinate = Some(Coordinate::new(35.66, 139.70).unwrap());
        listing
    }

    #[test]
    fn test_unresolved_listings_get_no_pin() {
        let mut sync = AnnotationSync::new();
        let mut renderer = RecordingRenderer::default();

        sync.sync(&mut renderer, &[Listing::new(ListingId(1), "addr")]);

        assert!(renderer.calls.is_empty());
        assert_eq!(sync.shown_count(), 0);
    }

    #[test]
    fn test_geocoded_listings_get_pins_once() {
        let mut sync = AnnotationSync::new();
        let mut renderer = RecordingRenderer::default();
        let listings = vec![geocoded(1), geocoded(2)];

        sync.sync(&mut renderer, &listings);
        assert_eq!(renderer.calls, vec!["add:1", "add:2"]);

        // Second pass with the same set is a no-op
        sync.sync(&mut renderer, &listings);
        assert_eq!(renderer.calls.len(), 2);
    }

    #[test]
    fn test_removed_listing_loses_pin() {
        let mut sync = AnnotationSync::new();
        let mut renderer = RecordingRenderer::default();

        sync.sync(&mut renderer, &[geocoded(1), geocoded(2)]);
        renderer.calls.clear();

        sync.sync(&mut renderer, &[geocoded(2)]);
        assert_eq!(renderer.calls, vec!["remove:1"]);
        assert_eq!(sync.shown_count(), 1);
    }

    #[test]
    fn test_clear_removes_all_pins() {
        let mut sync = AnnotationSync::new();
        let mut renderer = RecordingRenderer::default();

        sync.sync(&mut renderer, &[geocoded(1), geocoded(2)]);
        renderer.calls.clear();

        sync.clear(&mut renderer);
        assert_eq!(renderer.calls, vec!["remove:1", "remove:2"]);
        assert_eq!(sync.shown_count(), 0);
    }
}
