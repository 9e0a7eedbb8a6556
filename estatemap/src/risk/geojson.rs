//! Tolerant GeoJSON FeatureCollection decoding for hazard layers.
//!
//! The upstream documents are not always clean: features may carry a rank
//! as a number or a string, omit it entirely, or use geometry types we do
//! not render. Decoding degrades per feature instead of failing the whole
//! document - only an unparsable top-level collection is an error.

use super::{RiskError, RiskLayer, RiskPolygon, RANK_MAX};
use crate::coord::Coordinate;
use serde::Deserialize;
use tracing::{debug, trace};

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<Properties>,
    geometry: Option<Geometry>,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    #[serde(default)]
    rank: Option<serde_json::Value>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// Positions are `[lon, lat]`, sometimes with a trailing altitude.
type Position = Vec<f64>;
type Ring = Vec<Position>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon { coordinates: Vec<Ring> },
    MultiPolygon { coordinates: Vec<Vec<Ring>> },
}

/// Decodes a layer document into polygons.
///
/// Malformed features, unknown geometry types and empty rings are skipped
/// silently; a missing or unparsable rank becomes 0.
pub(crate) fn decode_layer(layer: RiskLayer, bytes: &[u8]) -> Result<Vec<RiskPolygon>, RiskError> {
    let collection: FeatureCollection =
        serde_json::from_slice(bytes).map_err(|e| RiskError::Decode(e.to_string()))?;

    let total = collection.features.len();
    let mut polygons = Vec::with_capacity(total);

    for value in collection.features {
        let Ok(feature) = serde_json::from_value::<Feature>(value) else {
            trace!(layer = %layer, "skipping malformed feature");
            continue;
        };

        let Some(ring) = feature.geometry.and_then(outer_ring) else {
            continue;
        };
        if ring.is_empty() {
            continue;
        }

        let properties = feature.properties.unwrap_or_default();
        polygons.push(RiskPolygon {
            layer,
            rank: parse_rank(properties.rank.as_ref()),
            ring,
            label: properties.label.or(properties.name),
        });
    }

    debug!(
        layer = %layer,
        features = total,
        polygons = polygons.len(),
        "layer decoded"
    );
    Ok(polygons)
}

/// Extracts the outer boundary of a geometry.
///
/// `Polygon` coordinates are rings-of-rings with the first ring as the
/// outer boundary; for `MultiPolygon` the first polygon's outer ring is
/// taken.
fn outer_ring(geometry: Geometry) -> Option<Vec<Coordinate>> {
    let ring = match geometry {
        Geometry::Polygon { coordinates } => coordinates.into_iter().next()?,
        Geometry::MultiPolygon { coordinates } => {
            coordinates.into_iter().next()?.into_iter().next()?
        }
    };

    let vertices: Vec<Coordinate> = ring
        .into_iter()
        .filter_map(|position| {
            if position.len() < 2 {
                return None;
            }
            let (lon, lat) = (position[0], position[1]);
            Coordinate::new(lat, lon).ok()
        })
        .collect();

    Some(vertices)
}

/// Coerces a rank value into `0..=5`; anything else means unknown (0).
fn parse_rank(value: Option<&serde_json::Value>) -> u8 {
    let rank = match value {
        Some(v) => v
            .as_i64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())),
        None => None,
    };

    match rank {
        Some(r) if (1..=RANK_MAX as i64).contains(&r) => r as u8,
        _ => 0,
    }
}
