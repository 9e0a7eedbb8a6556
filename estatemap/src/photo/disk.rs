//! On-disk photo cache.
//!
//! Trimmed photos are persisted as PNG, one file per source URL, named by
//! the SHA-256 of the URL. PNG is lossless, so a photo read back from disk
//! decodes to the same pixels that were written.
//!
//! All functions here do blocking I/O; the pipeline calls them through
//! `spawn_blocking`.

use super::{Photo, PhotoError};
use image::{DynamicImage, ImageFormat};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Filesystem tier of the photo cache.
#[derive(Debug, Clone)]
pub struct PhotoDiskCache {
    cache_dir: PathBuf,
}

impl PhotoDiskCache {
    /// Opens the cache at `cache_dir`, creating the directory if needed.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self, PhotoError> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)
            .map_err(|e| PhotoError::Io(format!("create {}: {e}", cache_dir.display())))?;
        Ok(Self { cache_dir })
    }

    /// Directory holding the cached files.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// File path for a URL: hex SHA-256 of the URL plus a `.png` suffix.
    pub fn path_for(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        self.cache_dir.join(format!("{digest:x}.png"))
    }

    /// Whether a cached file exists for the URL.
    pub fn contains(&self, url: &str) -> bool {
        self.path_for(url).exists()
    }

    /// Reads and decodes the cached photo for a URL.
    ///
    /// A missing file is a plain miss. A file that no longer decodes is
    /// removed and also reported as a miss, so the pipeline falls through
    /// to the network.
    pub fn read(&self, url: &str) -> Result<Option<Photo>, PhotoError> {
        let path = self.path_for(url);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PhotoError::Io(format!("read {}: {e}", path.display()))),
        };

        match image::load_from_memory_with_format(&bytes, ImageFormat::Png) {
            Ok(decoded) => Ok(Some(Photo::new(decoded.to_rgba8()))),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt cached photo, removing");
                let _ = fs::remove_file(&path);
                Ok(None)
            }
        }
    }

    /// Encodes a photo as PNG and writes it to the cache.
    pub fn write(&self, url: &str, photo: &Photo) -> Result<(), PhotoError> {
        let path = self.path_for(url);

        let mut encoded = Vec::new();
        DynamicImage::ImageRgba8(photo.image.clone())
            .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)
            .map_err(|e| PhotoError::Io(format!("encode {}: {e}", path.display())))?;

        fs::write(&path, &encoded)
            .map_err(|e| PhotoError::Io(format!("write {}: {e}", path.display())))?;
        debug!(path = %path.display(), bytes = encoded.len(), "photo written to disk cache");
        Ok(())
    }

    /// Removes the cached file for a URL, if any.
    pub fn remove(&self, url: &str) -> Result<(), PhotoError> {
        let path = self.path_for(url);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PhotoError::Io(format!("remove {}: {e}", path.display()))),
        }
    }

    /// Deletes every cached file.
    pub fn clear(&self) -> Result<(), PhotoError> {
        let entries = fs::read_dir(&self.cache_dir)
            .map_err(|e| PhotoError::Io(format!("read dir {}: {e}", self.cache_dir.display())))?;
        for entry in entries {
            let entry =
                entry.map_err(|e| PhotoError::Io(format!("read dir entry: {e}")))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "png") {
                fs::remove_file(&path)
                    .map_err(|e| PhotoError::Io(format!("remove {}: {e}", path.display())))?;
            }
        }
        Ok(())
    }
}
