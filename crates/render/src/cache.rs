//! Rendered-page bitmap cache
//!
//! Memoizes one bitmap per `(page, scale, container width)` so
//! re-entering the viewport does not re-render a page. The policy is
//! flush-everything on zoom change rather than LRU: documents here have
//! few enough pages that a wholesale flush is cheap, and it removes an
//! entire class of stale-dimension bugs.
//!
//! The cache is owned by one viewer session and handed to the renderer
//! by reference; it is never shared across documents.

use crate::engine::Bitmap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Cache key for one rendered page bitmap
///
/// The scale is quantized to a thousandth so it can participate in a
/// hashable key; zoom steps in the viewer are far coarser than that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderKey {
    pub page_number: u32,
    scale_milli: u32,
    pub container_width: u32,
}

impl RenderKey {
    pub fn new(page_number: u32, scale: f64, container_width: u32) -> Self {
        Self {
            page_number,
            scale_milli: (scale * 1000.0).round() as u32,
            container_width,
        }
    }
}

/// Hit/miss counters for diagnostics
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub memory_used: usize,
    pub hits: u64,
    pub misses: u64,
    pub flushes: u64,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<RenderKey, Arc<Bitmap>>,
    memory_used: usize,
    hits: u64,
    misses: u64,
    flushes: u64,
}

/// Flush-on-zoom bitmap cache
///
/// A hit returns the identical `Arc<Bitmap>` that was stored, so
/// consumers can verify reuse by pointer identity and the renderer is
/// never re-invoked for a cached key.
#[derive(Default)]
pub struct RenderCache {
    inner: Mutex<CacheInner>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a bitmap, counting the probe as a hit or miss
    pub fn get(&self, key: &RenderKey) -> Option<Arc<Bitmap>> {
        let mut inner = self.inner.lock().unwrap();
        match inner.entries.get(key) {
            Some(bitmap) => {
                let bitmap = Arc::clone(bitmap);
                inner.hits += 1;
                Some(bitmap)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Store a bitmap, replacing any entry under the same key
    pub fn put(&self, key: RenderKey, bitmap: Arc<Bitmap>) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(old) = inner.entries.insert(key, Arc::clone(&bitmap)) {
            inner.memory_used = inner.memory_used.saturating_sub(old.memory_size());
        }
        inner.memory_used += bitmap.memory_size();
    }

    /// Release every entry
    ///
    /// Must run whenever the zoom scale changes, before renders at the
    /// new scale begin. Dropping the `Arc`s releases the pixel buffers
    /// once no consumer still displays them.
    pub fn flush(&self) {
        let mut inner = self.inner.lock().unwrap();
        let released = inner.entries.len();
        inner.entries.clear();
        inner.memory_used = 0;
        inner.flushes += 1;
        log::debug!("render cache flushed ({released} entries released)");
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().entries.is_empty()
    }

    pub fn contains(&self, key: &RenderKey) -> bool {
        self.inner.lock().unwrap().entries.contains_key(key)
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().unwrap();
        CacheStats {
            entries: inner.entries.len(),
            memory_used: inner.memory_used,
            hits: inner.hits,
            misses: inner.misses,
            flushes: inner.flushes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap(bytes: usize) -> Arc<Bitmap> {
        Arc::new(Bitmap {
            width: 1,
            height: 1,
            pixels: vec![0xff; bytes],
        })
    }

    #[test]
    fn hit_returns_the_identical_bitmap() {
        let cache = RenderCache::new();
        let key = RenderKey::new(3, 1.5, 900);
        let stored = bitmap(16);

        cache.put(key, Arc::clone(&stored));
        let fetched = cache.get(&key).unwrap();

        assert!(Arc::ptr_eq(&stored, &fetched));
    }

    #[test]
    fn distinct_scale_or_width_is_a_distinct_key() {
        let cache = RenderCache::new();
        cache.put(RenderKey::new(1, 1.0, 800), bitmap(4));

        assert!(cache.get(&RenderKey::new(1, 1.2, 800)).is_none());
        assert!(cache.get(&RenderKey::new(1, 1.0, 900)).is_none());
        assert!(cache.get(&RenderKey::new(2, 1.0, 800)).is_none());
        assert!(cache.get(&RenderKey::new(1, 1.0, 800)).is_some());
    }

    #[test]
    fn scale_quantization_is_stable() {
        assert_eq!(RenderKey::new(1, 1.5, 800), RenderKey::new(1, 1.5000000001, 800));
        assert_ne!(RenderKey::new(1, 1.5, 800), RenderKey::new(1, 1.501, 800));
    }

    #[test]
    fn flush_releases_everything_and_counts() {
        let cache = RenderCache::new();
        cache.put(RenderKey::new(1, 1.0, 800), bitmap(8));
        cache.put(RenderKey::new(2, 1.0, 800), bitmap(8));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().memory_used, 16);

        cache.flush();

        assert!(cache.is_empty());
        let stats = cache.stats();
        assert_eq!(stats.memory_used, 0);
        assert_eq!(stats.flushes, 1);
        assert!(cache.get(&RenderKey::new(1, 1.0, 800)).is_none());
    }

    #[test]
    fn replacing_an_entry_adjusts_memory_accounting() {
        let cache = RenderCache::new();
        let key = RenderKey::new(1, 1.0, 800);

        cache.put(key, bitmap(100));
        cache.put(key, bitmap(40));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().memory_used, 40);
    }

    #[test]
    fn stats_track_hits_and_misses() {
        let cache = RenderCache::new();
        let key = RenderKey::new(1, 1.0, 800);

        assert!(cache.get(&key).is_none());
        cache.put(key, bitmap(4));
        assert!(cache.get(&key).is_some());
        assert!(cache.get(&key).is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }
}
