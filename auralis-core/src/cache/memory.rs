//! L1 cache: bounded in-memory LRU keyed by cache key, fronting the
//! persistent L2 store.
use auralis_dsp::AudioFingerprint;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

pub struct MemoryCache {
    inner: Mutex<LruCache<String, AudioFingerprint>>,
}

impl MemoryCache {
    pub fn new(max_memory: usize) -> Self {
        let capacity = NonZeroUsize::new(max_memory.max(1)).unwrap();
        Self { inner: Mutex::new(LruCache::new(capacity)) }
    }

    /// Looks up `key`; a hit moves the entry to most-recently-used.
    pub fn get(&self, key: &str) -> Option<AudioFingerprint> {
        self.inner.lock().get(key).copied()
    }

    /// Inserts at most-recently-used, evicting least-recently-used if over
    /// capacity. `lru::LruCache` does this automatically on `put`.
    pub fn put(&self, key: String, fingerprint: AudioFingerprint) {
        self.inner.lock().put(key, fingerprint);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_after_put_hits() {
        let cache = MemoryCache::new(2);
        cache.put("a".into(), AudioFingerprint::neutral());
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn capacity_is_enforced_by_eviction() {
        let cache = MemoryCache::new(2);
        cache.put("a".into(), AudioFingerprint::neutral());
        cache.put("b".into(), AudioFingerprint::neutral());
        cache.put("c".into(), AudioFingerprint::neutral());
        assert_eq!(cache.len(), 2);
        // "a" was least-recently-used and should have been evicted.
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn get_refreshes_recency() {
        let cache = MemoryCache::new(2);
        cache.put("a".into(), AudioFingerprint::neutral());
        cache.put("b".into(), AudioFingerprint::neutral());
        cache.get("a");
        cache.put("c".into(), AudioFingerprint::neutral());
        // "b" is now least-recently-used, not "a".
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
    }
}
