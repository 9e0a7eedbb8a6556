//! Listing photograph acquisition: two-tier cache, network fetch and
//! whitespace-border trimming.
//!
//! Lookup order is memory, then disk, then network. A fetched photo is
//! decoded, trimmed and stored in both tiers keyed by its source URL, so
//! repeated requests cost one hash lookup.

mod disk;
mod memory;
mod pipeline;
mod trim;

pub use disk::PhotoDiskCache;
pub use memory::PhotoMemoryCache;
pub use pipeline::{PhotoPipeline, PhotoStatsSnapshot};
pub use trim::trim_whitespace_border;

use crate::http::HttpError;
use image::RgbaImage;
use thiserror::Error;

/// Display orientation carried alongside the pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Default, row 0 at the top
    #[default]
    Up,
    Down,
    Left,
    Right,
}

/// A decoded photograph plus its display metadata.
///
/// The scale and orientation survive trimming and caching untouched; the
/// pixel buffer is what gets trimmed and persisted.
#[derive(Debug, Clone)]
pub struct Photo {
    /// Decoded RGBA pixels
    pub image: RgbaImage,
    /// Point-to-pixel scale factor
    pub scale: f32,
    /// Display orientation
    pub orientation: Orientation,
}

impl Photo {
    /// Wraps a decoded image with default metadata.
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image,
            scale: 1.0,
            orientation: Orientation::default(),
        }
    }

    /// Pixel dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Size of the pixel buffer in bytes, used for memory cache accounting.
    pub fn byte_size(&self) -> usize {
        self.image.as_raw().len()
    }
}

/// Photo pipeline errors.
///
/// `Clone` so one failure can be delivered to every coalesced waiter. All
/// variants resolve to a placeholder on the caller's side; none is fatal.
#[derive(Debug, Clone, Error)]
pub enum PhotoError {
    /// Download failed (includes timeouts)
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Fetched bytes could not be decoded; terminal for this request
    #[error("image decode failed: {0}")]
    Decode(String),

    /// Disk tier I/O failure
    #[error("photo cache I/O error: {0}")]
    Io(String),

    /// The request's cancellation token fired
    #[error("photo request cancelled")]
    Cancelled,
}
