use std::sync::{Arc, Mutex};

use lru_cache::LruCache;

use super::MxRecord;

/// Process-lifetime MX cache, bounded LRU. Entries are immutable once
/// inserted; only successful lookups are cached.
pub(crate) struct MxCache {
    inner: Mutex<LruCache<String, Arc<Vec<MxRecord>>>>,
}

impl MxCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity.max(1))),
        }
    }

    pub(crate) fn get(&self, domain: &str) -> Option<Arc<Vec<MxRecord>>> {
        let mut cache = self.inner.lock().expect("mx cache poisoned");
        cache.get_mut(domain).cloned()
    }

    pub(crate) fn insert(&self, domain: &str, records: Arc<Vec<MxRecord>>) {
        let mut cache = self.inner.lock().expect("mx cache poisoned");
        cache.insert(domain.to_string(), records);
    }
}
