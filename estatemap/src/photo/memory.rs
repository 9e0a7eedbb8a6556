//! In-memory photo cache with LRU eviction.

use super::Photo;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Entry in the memory cache.
#[derive(Debug, Clone)]
struct CacheEntry {
    /// Cached photo, shared with callers
    photo: Arc<Photo>,
    /// Last access time for LRU eviction
    last_accessed: Instant,
    /// Number of times accessed
    access_count: u64,
}

impl CacheEntry {
    fn new(photo: Arc<Photo>) -> Self {
        Self {
            photo,
            last_accessed: Instant::now(),
            access_count: 0,
        }
    }

    /// Update access time and increment access count.
    fn touch(&mut self) {
        self.last_accessed = Instant::now();
        self.access_count += 1;
    }
}

/// Byte-bounded in-memory cache of decoded photos, keyed by source URL.
///
/// Accounting uses the pixel buffer size, so the limit tracks real memory
/// pressure rather than entry counts. Least recently used entries are
/// evicted when an insert would exceed the limit.
pub struct PhotoMemoryCache {
    cache: Mutex<HashMap<String, CacheEntry>>,
    max_size_bytes: usize,
    current_size_bytes: Mutex<usize>,
    evictions: AtomicU64,
}

impl PhotoMemoryCache {
    /// Create a new memory cache with the given size limit in bytes.
    pub fn new(max_size_bytes: usize) -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            max_size_bytes,
            current_size_bytes: Mutex::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Get a cached photo, updating its access time.
    pub fn get(&self, url: &str) -> Option<Arc<Photo>> {
        let mut cache = self.cache.lock().unwrap();
        cache.get_mut(url).map(|entry| {
            entry.touch();
            Arc::clone(&entry.photo)
        })
    }

    /// Put a photo into the cache, evicting LRU entries first if the
    /// insert would exceed the size limit.
    pub fn put(&self, url: String, photo: Arc<Photo>) {
        let photo_size = photo.byte_size();

        {
            let current_size = self.current_size_bytes.lock().unwrap();
            if *current_size + photo_size > self.max_size_bytes {
                drop(current_size);
                self.evict_lru_until_fits(photo_size);
            }
        }

        let mut cache = self.cache.lock().unwrap();
        let mut current_size = self.current_size_bytes.lock().unwrap();
        if let Some(old) = cache.insert(url, CacheEntry::new(photo)) {
            *current_size = current_size.saturating_sub(old.photo.byte_size());
        }
        *current_size += photo_size;
    }

    /// Check if a URL is cached.
    pub fn contains(&self, url: &str) -> bool {
        self.cache.lock().unwrap().contains_key(url)
    }

    /// Current number of cached photos.
    pub fn entry_count(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    /// Current size of the cache in bytes.
    pub fn size_bytes(&self) -> usize {
        *self.current_size_bytes.lock().unwrap()
    }

    /// Maximum size of the cache in bytes.
    pub fn max_size_bytes(&self) -> usize {
        self.max_size_bytes
    }

    /// Total entries evicted since creation.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.cache.lock().unwrap().clear();
        *self.current_size_bytes.lock().unwrap() = 0;
    }

    /// Evict least recently used entries until `required_size` fits.
    fn evict_lru_until_fits(&self, required_size: usize) {
        let mut cache = self.cache.lock().unwrap();
        let mut current_size = self.current_size_bytes.lock().unwrap();

        let target_size = self.max_size_bytes.saturating_sub(required_size);

        let mut entries: Vec<(String, Instant, usize)> = cache
            .iter()
            .map(|(url, entry)| (url.clone(), entry.last_accessed, entry.photo.byte_size()))
            .collect();
        entries.sort_by_key(|(_, accessed, _)| *accessed);

        let mut evicted = 0;
        for (url, _, size) in entries {
            if *current_size <= target_size {
                break;
            }
            cache.remove(&url);
            *current_size = current_size.saturating_sub(size);
            evicted += 1;
        }

        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
            tracing::debug!(
                evicted,
                size_bytes = *current_size,
                "photo memory cache evicted entries"
            );
        }
    }
}
