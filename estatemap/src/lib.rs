//! EstateMap - listing enrichment and caching pipeline
//!
//! This library provides the asynchronous backend of a property-browsing map
//! view: batch geocoding of listing addresses under a provider rate limit,
//! fetching and caching of hazard-zone GeoJSON layers, diff-based map overlay
//! reconstruction, and a two-tier (memory + disk) photo cache with a
//! whitespace-border trim pass.
//!
//! # High-Level API
//!
//! ```ignore
//! use std::sync::Arc;
//! use estatemap::config::{GeocodeConfig, PhotoConfig, RiskConfig};
//! use estatemap::geocode::{AddressResolver, NominatimGeocoder};
//! use estatemap::http::AsyncReqwestClient;
//! use estatemap::photo::PhotoPipeline;
//! use estatemap::risk::RiskLayerCache;
//! use tokio_util::sync::CancellationToken;
//!
//! let client = AsyncReqwestClient::new()?;
//! let resolver = AddressResolver::new(
//!     NominatimGeocoder::new(client.clone()),
//!     GeocodeConfig::default(),
//! );
//! let risk = Arc::new(RiskLayerCache::new(client.clone(), RiskConfig::default()));
//! let photos = Arc::new(PhotoPipeline::new(client, PhotoConfig::default())?);
//!
//! // Fill in missing coordinates for the whole record set.
//! let failed = resolver.resolve_pending(&store, CancellationToken::new()).await;
//! ```

pub mod config;
pub mod coord;
pub mod geocode;
pub mod http;
pub mod logging;
pub mod overlay;
pub mod photo;
pub mod pipeline;
pub mod record;
pub mod risk;

/// Version of the EstateMap library.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
