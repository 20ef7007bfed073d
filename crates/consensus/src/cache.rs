use lru::LruCache;
use parking_lot::Mutex;
use prometheus::IntGauge;
use std::hash::Hash;
use std::num::NonZeroUsize;

use crate::{ConsensusError, Result};

/// Fixed-capacity, thread-safe cache with least-recently-used eviction.
///
/// `get` counts as an access. The attached gauge tracks the number of live
/// entries and is updated on every insert and removal.
pub struct BoundedCache<K: Hash + Eq, V> {
    inner: Mutex<LruCache<K, V>>,
    gauge: IntGauge,
}

impl<K: Hash + Eq, V: Clone> BoundedCache<K, V> {
    pub fn new(capacity: usize, gauge: IntGauge) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or(ConsensusError::InvalidCacheCapacity)?;
        gauge.set(0);
        
        Ok(Self {
            inner: Mutex::new(LruCache::new(capacity)),
            gauge,
        })
    }
    
    /// Look up `key`, marking it most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }
    
    /// Insert or replace `key`, evicting the coldest entry when full.
    pub fn add(&self, key: K, value: V) {
        let mut inner = self.inner.lock();
        inner.put(key, value);
        self.gauge.set(inner.len() as i64);
    }
    
    pub fn remove(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        let removed = inner.pop(key);
        self.gauge.set(inner.len() as i64);
        removed
    }
    
    /// Membership test that leaves recency untouched.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }
    
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
    
    pub fn capacity(&self) -> usize {
        self.inner.lock().cap().get()
    }
}

impl<K: Hash + Eq + Ord + Copy, V: Clone> BoundedCache<K, V> {
    /// Entry with the greatest key strictly below `key`, marked most recently used.
    pub fn last_before(&self, key: &K) -> Option<(K, V)> {
        let mut inner = self.inner.lock();
        let nearest = inner
            .iter()
            .map(|(k, _)| *k)
            .filter(|k| k < key)
            .max()?;
        inner.get(&nearest).cloned().map(|value| (nearest, value))
    }
    
    /// Drop every entry whose key is at or above `key`. Returns how many were removed.
    pub fn remove_from(&self, key: &K) -> usize {
        let mut inner = self.inner.lock();
        let stale: Vec<K> = inner
            .iter()
            .map(|(k, _)| *k)
            .filter(|k| k >= key)
            .collect();
        for k in &stale {
            inner.pop(k);
        }
        self.gauge.set(inner.len() as i64);
        stale.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    
    fn cache(capacity: usize) -> BoundedCache<u64, &'static str> {
        let gauge = IntGauge::new("test_cache_length", "test").unwrap();
        BoundedCache::new(capacity, gauge).unwrap()
    }
    
    #[test]
    fn test_zero_capacity_rejected() {
        let gauge = IntGauge::new("test_cache_length", "test").unwrap();
        assert!(matches!(
            BoundedCache::<u64, u64>::new(0, gauge),
            Err(ConsensusError::InvalidCacheCapacity)
        ));
    }
    
    #[test]
    fn test_evicts_least_recently_added() {
        let cache = cache(3);
        cache.add(1, "a");
        cache.add(2, "b");
        cache.add(3, "c");
        cache.add(4, "d");
        
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some("b"));
        assert_eq!(cache.get(&3), Some("c"));
        assert_eq!(cache.get(&4), Some("d"));
    }
    
    #[test]
    fn test_get_protects_from_eviction() {
        let cache = cache(3);
        cache.add(1, "a");
        cache.add(2, "b");
        cache.add(3, "c");
        
        // Touch the oldest entry so 2 becomes the coldest
        assert_eq!(cache.get(&1), Some("a"));
        cache.add(4, "d");
        
        assert!(cache.contains(&1));
        assert!(!cache.contains(&2));
        assert!(cache.contains(&3));
        assert!(cache.contains(&4));
    }
    
    #[test]
    fn test_add_updates_existing_key() {
        let cache = cache(2);
        cache.add(1, "a");
        cache.add(2, "b");
        cache.add(1, "z");
        cache.add(3, "c");
        
        assert_eq!(cache.get(&1), Some("z"));
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.len(), 2);
    }
    
    #[test]
    fn test_gauge_tracks_occupancy() {
        let gauge = IntGauge::new("test_cache_length", "test").unwrap();
        let cache = BoundedCache::new(2, gauge.clone()).unwrap();
        
        cache.add(1u64, 10u64);
        assert_eq!(gauge.get(), 1);
        cache.add(2, 20);
        cache.add(3, 30);
        assert_eq!(gauge.get(), 2);
        cache.remove(&3);
        assert_eq!(gauge.get(), 1);
    }
    
    #[test]
    fn test_last_before() {
        let cache = cache(8);
        cache.add(3, "c");
        cache.add(10, "j");
        cache.add(20, "t");
        
        assert_eq!(cache.last_before(&15), Some((10, "j")));
        assert_eq!(cache.last_before(&10), Some((3, "c")));
        assert_eq!(cache.last_before(&3), None);
    }
    
    #[test]
    fn test_remove_from() {
        let cache = cache(8);
        for slot in 1..=6 {
            cache.add(slot, "x");
        }
        
        assert_eq!(cache.remove_from(&4), 3);
        assert_eq!(cache.len(), 3);
        assert!(cache.contains(&3));
        assert!(!cache.contains(&4));
    }
    
    #[test]
    fn test_concurrent_access() {
        let gauge = IntGauge::new("test_cache_length", "test").unwrap();
        let cache = Arc::new(BoundedCache::new(64, gauge).unwrap());
        
        let handles: Vec<_> = (0..8u64)
            .map(|worker| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..1_000u64 {
                        let key = worker * 1_000 + i;
                        cache.add(key, key);
                        let _ = cache.get(&key);
                    }
                })
            })
            .collect();
        
        for handle in handles {
            handle.join().unwrap();
        }
        
        assert_eq!(cache.len(), 64);
    }
}
