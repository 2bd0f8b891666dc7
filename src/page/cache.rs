//! LRU cache for decoded page payloads.
//!
//! Page fetches from a v0.2.0 table go through one shared [`PageCache`] so
//! that repeated scans of the same column do not hit the file again.

use crate::format::PageRef;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Statistics for cache performance monitoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    /// Total number of cache lookups
    pub lookups: u64,
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of insertions
    pub insertions: u64,
    /// Number of evictions
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }
}

#[derive(Debug, Default)]
struct CacheInner {
    pages: HashMap<PageRef, Bytes>,
    /// Most recently used at the back
    lru_queue: VecDeque<PageRef>,
    size: usize,
    stats: CacheStats,
}

impl CacheInner {
    fn touch(&mut self, key: &PageRef) {
        if let Some(pos) = self.lru_queue.iter().position(|k| k == key) {
            self.lru_queue.remove(pos);
        }
        self.lru_queue.push_back(*key);
    }

    fn evict_one(&mut self) -> bool {
        let Some(key) = self.lru_queue.pop_front() else {
            return false;
        };
        if let Some(value) = self.pages.remove(&key) {
            self.size -= value.len();
            self.stats.evictions += 1;
        }
        true
    }
}

/// Thread-safe LRU cache of page payloads keyed by their [`PageRef`].
///
/// Capacity is counted in payload bytes. A capacity of 0 disables caching.
#[derive(Debug)]
pub struct PageCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl PageCache {
    /// Create a new PageCache with the specified capacity in bytes.
    pub fn new(capacity: usize) -> Self {
        Self { capacity, inner: Mutex::new(CacheInner::default()) }
    }

    /// Get a page from the cache, marking it most recently used.
    pub fn get(&self, key: &PageRef) -> Option<Bytes> {
        let mut inner = self.inner.lock();
        inner.stats.lookups += 1;

        match inner.pages.get(key).cloned() {
            Some(value) => {
                inner.touch(key);
                inner.stats.hits += 1;
                Some(value)
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    /// Insert a page, evicting least recently used pages to make room.
    ///
    /// Pages larger than the whole cache are not cached.
    pub fn insert(&self, key: PageRef, value: Bytes) {
        if self.capacity == 0 || value.len() > self.capacity {
            return;
        }

        let mut inner = self.inner.lock();
        if let Some(old) = inner.pages.remove(&key) {
            inner.size -= old.len();
            inner.lru_queue.retain(|k| k != &key);
        }

        while inner.size + value.len() > self.capacity {
            if !inner.evict_one() {
                break;
            }
        }

        inner.size += value.len();
        inner.pages.insert(key, value);
        inner.lru_queue.push_back(key);
        inner.stats.insertions += 1;
    }

    /// Get current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats.clone()
    }

    /// Get the current size of cached data in bytes.
    pub fn size(&self) -> usize {
        self.inner.lock().size
    }

    /// Get the number of entries in the cache.
    pub fn len(&self) -> usize {
        self.inner.lock().pages.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn page(n: u64) -> PageRef {
        PageRef::new(n * 100, 9)
    }

    #[test]
    fn test_cache_basic_operations() {
        let cache = PageCache::new(1024);
        let value = Bytes::from(vec![1, 2, 3, 4]);

        assert_eq!(cache.get(&page(1)), None);

        cache.insert(page(1), value.clone());
        assert_eq!(cache.get(&page(1)), Some(value));

        let stats = cache.stats();
        assert_eq!(stats.lookups, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.insertions, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cache_lru_eviction() {
        // Holds three 4-byte pages
        let cache = PageCache::new(12);
        let value = Bytes::from(vec![1, 2, 3, 4]);

        cache.insert(page(1), value.clone());
        cache.insert(page(2), value.clone());
        cache.insert(page(3), value.clone());
        assert_eq!(cache.size(), 12);

        // Touch page 1 so page 2 becomes least recently used
        assert!(cache.get(&page(1)).is_some());
        cache.insert(page(4), value.clone());

        assert_eq!(cache.len(), 3);
        assert!(cache.get(&page(1)).is_some());
        assert_eq!(cache.get(&page(2)), None);
        assert!(cache.get(&page(3)).is_some());
        assert!(cache.get(&page(4)).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_cache_update_existing_key() {
        let cache = PageCache::new(1024);

        cache.insert(page(1), Bytes::from(vec![1, 2, 3, 4]));
        cache.insert(page(1), Bytes::from(vec![5, 6, 7, 8, 9]));

        assert_eq!(cache.get(&page(1)), Some(Bytes::from(vec![5, 6, 7, 8, 9])));
        assert_eq!(cache.size(), 5);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_disabled_when_capacity_zero() {
        let cache = PageCache::new(0);
        cache.insert(page(1), Bytes::from_static(b"abcd"));

        assert_eq!(cache.get(&page(1)), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_cache_large_value_not_cached() {
        let cache = PageCache::new(10);
        cache.insert(page(1), Bytes::from(vec![0u8; 100]));

        assert_eq!(cache.get(&page(1)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_access() {
        use std::thread;

        let cache = Arc::new(PageCache::new(1024));
        let mut handles = vec![];

        for i in 0..10u64 {
            let cache_clone = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                let value = Bytes::from(vec![i as u8; 10]);
                cache_clone.insert(page(i), value.clone());
                assert_eq!(cache_clone.get(&page(i)), Some(value));
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 10);
    }
}
