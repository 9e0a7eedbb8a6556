//! Hazard/risk zone layers: types, GeoJSON decoding and the per-layer cache.
//!
//! Each layer is a remote GeoJSON FeatureCollection of ranked polygons
//! (earthquake building-collapse risk, fire-spread risk, and the combined
//! index). Layers are fetched once on demand and served from memory until
//! the cache is cleared.

mod cache;
mod geojson;

pub use cache::RiskLayerCache;

use crate::coord::Coordinate;
use crate::http::HttpError;
use std::fmt;
use thiserror::Error;

/// The closed set of hazard layers. Identity is stable for the process
/// lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RiskLayer {
    /// Building collapse risk in an earthquake
    BuildingCollapse,
    /// Fire spread risk
    Fire,
    /// Combined risk index
    CombinedRisk,
}

impl RiskLayer {
    /// All known layers.
    pub const ALL: [RiskLayer; 3] = [
        RiskLayer::BuildingCollapse,
        RiskLayer::Fire,
        RiskLayer::CombinedRisk,
    ];

    /// Filename of this layer's GeoJSON document under the base URL.
    pub fn file_name(&self) -> &'static str {
        match self {
            RiskLayer::BuildingCollapse => "building_collapse.geojson",
            RiskLayer::Fire => "fire.geojson",
            RiskLayer::CombinedRisk => "combined_risk.geojson",
        }
    }
}

impl fmt::Display for RiskLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RiskLayer::BuildingCollapse => "building-collapse",
            RiskLayer::Fire => "fire",
            RiskLayer::CombinedRisk => "combined-risk",
        };
        write!(f, "{}", name)
    }
}

/// Lowest meaningful severity rank; 0 means unknown/unparsed.
pub const RANK_UNKNOWN: u8 = 0;
/// Highest severity rank.
pub const RANK_MAX: u8 = 5;

/// One hazard polygon: a closed ring of vertices tagged with a severity
/// rank and its owning layer.
///
/// Invariant: `rank` is always in `0..=5`, 0 meaning unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskPolygon {
    /// Owning layer
    pub layer: RiskLayer,
    /// Severity rank (0 unknown, 1 lowest .. 5 highest)
    pub rank: u8,
    /// Outer boundary ring
    pub ring: Vec<Coordinate>,
    /// Optional display label from the source properties
    pub label: Option<String>,
}

/// Errors from layer fetching/decoding.
///
/// Non-fatal: a failed layer simply stays out of the cache and the next
/// `fetch_if_needed` retries.
#[derive(Debug, Clone, Error)]
pub enum RiskError {
    /// Transport-level failure (includes timeouts)
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The document was not a usable FeatureCollection
    #[error("malformed GeoJSON: {0}")]
    Decode(String),

    /// The caller's cancellation token fired
    #[error("layer fetch cancelled")]
    Cancelled,
}
