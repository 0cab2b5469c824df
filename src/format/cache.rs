//! Bounded recency-ordered cache of compiled templates
//!
//! `get` promotes a hit to most-recently-used, `set` on an existing key
//! refreshes its position, and inserting past capacity evicts exactly the
//! least-recently-used entry. Values are handed out as `Arc`s so an entry
//! evicted while a caller is still evaluating it stays alive for that caller.

use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Default number of compiled templates kept per instance
pub const DEFAULT_CAPACITY: usize = 256;

/// Fixed-capacity LRU map
pub struct BoundedCache<K: Hash + Eq, V> {
    inner: LruCache<K, Arc<V>>,
}

impl<K: Hash + Eq, V> BoundedCache<K, V> {
    /// Create a cache holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: LruCache::new(capacity),
        }
    }

    /// Get an entry and mark it most-recently-used
    pub fn get(&mut self, key: &K) -> Option<Arc<V>> {
        self.inner.get(key).cloned()
    }

    /// Insert or refresh an entry, evicting the least-recently-used on overflow
    ///
    /// Returns the shared handle to the stored value.
    pub fn set(&mut self, key: K, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.inner.put(key, Arc::clone(&value));
        value
    }

    /// Check membership without touching recency
    pub fn has(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    /// Remove an entry, returning whether it existed
    pub fn delete(&mut self, key: &K) -> bool {
        self.inner.pop(key).is_some()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Number of entries
    pub fn size(&self) -> usize {
        self.inner.len()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.inner.cap().get()
    }
}

impl<K: Hash + Eq, V> std::fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedCache")
            .field("size", &self.size())
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_least_recently_inserted() {
        let mut cache = BoundedCache::new(3);
        for k in ["a", "b", "c", "d"] {
            cache.set(k, k.to_uppercase());
        }

        assert_eq!(cache.size(), 3);
        assert!(!cache.has(&"a"));
        assert!(cache.has(&"b"));
        assert!(cache.has(&"d"));
    }

    #[test]
    fn test_get_promotes() {
        let mut cache = BoundedCache::new(2);
        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.get(&"a").as_deref(), Some(&1));

        cache.set("c", 3);
        assert!(cache.has(&"a"));
        assert!(!cache.has(&"b"));
    }

    #[test]
    fn test_set_refreshes_position() {
        let mut cache = BoundedCache::new(2);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("a", 10);

        cache.set("c", 3);
        assert_eq!(cache.get(&"a").as_deref(), Some(&10));
        assert!(!cache.has(&"b"));
    }

    #[test]
    fn test_has_does_not_promote() {
        let mut cache = BoundedCache::new(2);
        cache.set("a", 1);
        cache.set("b", 2);
        assert!(cache.has(&"a"));

        cache.set("c", 3);
        assert!(!cache.has(&"a"));
    }

    #[test]
    fn test_delete_and_clear() {
        let mut cache = BoundedCache::new(4);
        cache.set("a", 1);
        cache.set("b", 2);

        assert!(cache.delete(&"a"));
        assert!(!cache.delete(&"a"));
        assert_eq!(cache.size(), 1);

        cache.clear();
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.capacity(), 4);
    }

    #[test]
    fn test_evicted_handle_stays_valid() {
        let mut cache = BoundedCache::new(1);
        let held = cache.set("a", String::from("compiled"));
        cache.set("b", String::from("other"));

        assert!(!cache.has(&"a"));
        assert_eq!(held.as_str(), "compiled");
    }

    #[test]
    fn test_zero_capacity_clamps_to_one() {
        let mut cache = BoundedCache::new(0);
        cache.set(1, ());
        assert_eq!(cache.capacity(), 1);
        assert_eq!(cache.size(), 1);
    }
}
