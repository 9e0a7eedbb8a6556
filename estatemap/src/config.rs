//! Configuration types for the enrichment pipeline.
//!
//! Each struct groups the parameters of one subsystem and provides
//! builder-style setters over sensible defaults.
//!
//! # Example
//!
//! ```
//! use estatemap::config::{GeocodeConfig, RiskConfig};
//! use std::time::Duration;
//!
//! let geocode = GeocodeConfig::default().with_max_concurrent(4);
//! let risk = RiskConfig::default().with_base_url("https://example.com/layers");
//! assert_eq!(geocode.max_concurrent, 4);
//! assert_eq!(risk.fetch_timeout, Duration::from_secs(30));
//! ```

use std::path::PathBuf;
use std::time::Duration;

/// Default documented base URL for hazard layer GeoJSON documents.
///
/// Each layer is served as `<base>/<layer-filename>.geojson`.
pub const DEFAULT_RISK_BASE_URL: &str = "https://static.estatemap.app/hazard";

/// Geocoding batch configuration.
#[derive(Debug, Clone)]
pub struct GeocodeConfig {
    /// Admission cap on concurrent in-flight geocode calls (default: 2)
    pub max_concurrent: usize,
    /// Cooldown after each successful geocode before the worker slot is
    /// released, respecting the provider's ~1 req/sec ceiling (default: 300 ms)
    pub success_cooldown: Duration,
    /// Per-call timeout; a timed-out call counts as a plain failure
    /// (default: 10 s)
    pub call_timeout: Duration,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            success_cooldown: Duration::from_millis(300),
            call_timeout: Duration::from_secs(10),
        }
    }
}

impl GeocodeConfig {
    /// Sets the concurrent in-flight call cap.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Sets the post-success cooldown.
    pub fn with_success_cooldown(mut self, cooldown: Duration) -> Self {
        self.success_cooldown = cooldown;
        self
    }

    /// Sets the per-call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

/// Hazard layer cache configuration.
#[derive(Debug, Clone)]
pub struct RiskConfig {
    /// Base URL under which layer GeoJSON files are published
    pub base_url: String,
    /// Timeout for one layer fetch (default: 30 s)
    pub fetch_timeout: Duration,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_RISK_BASE_URL.to_string(),
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl RiskConfig {
    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

/// Photo pipeline configuration.
#[derive(Debug, Clone)]
pub struct PhotoConfig {
    /// Maximum bytes of decoded pixels held in the memory tier
    /// (default: 64 MB)
    pub memory_max_bytes: usize,
    /// Directory for the disk tier; entirely disposable
    pub cache_dir: PathBuf,
    /// Timeout for one photo download (default: 30 s)
    pub fetch_timeout: Duration,
}

impl Default for PhotoConfig {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("estatemap")
            .join("photos");

        Self {
            memory_max_bytes: 64 * 1024 * 1024,
            cache_dir,
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl PhotoConfig {
    /// Sets the memory tier byte budget.
    pub fn with_memory_max_bytes(mut self, bytes: usize) -> Self {
        self.memory_max_bytes = bytes;
        self
    }

    /// Sets the disk cache directory.
    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = dir;
        self
    }

    /// Sets the download timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}
