//! DNS MX resolution: ordered exchanges, A-record fallback, parking sniff,
//! and a process-lifetime cache.

mod cache;
mod error;
mod resolver;
mod types;

pub use error::MxLookupError;
pub use resolver::{DnsMx, LookupMx};
pub use types::MxRecord;

use std::sync::Arc;
use std::time::Duration;

use cache::MxCache;

pub const DNS_LIFETIME: Duration = Duration::from_secs(4);
const CACHE_CAPACITY: usize = 4_096;

/// MX resolution front-end: caches successful lookups by domain for the
/// process lifetime (bounded LRU), single-writer-many-readers.
pub struct MxResolver {
    lookup: Arc<dyn LookupMx>,
    cache: MxCache,
}

impl MxResolver {
    pub fn from_system_conf() -> Result<Self, MxLookupError> {
        Ok(Self::new(Arc::new(DnsMx::from_system_conf(DNS_LIFETIME)?)))
    }

    pub fn new(lookup: Arc<dyn LookupMx>) -> Self {
        Self {
            lookup,
            cache: MxCache::new(CACHE_CAPACITY),
        }
    }

    /// Ordered MX record set for `domain` (ascending preference, then host).
    /// Empty means the domain has neither MX nor address records.
    pub async fn resolve(&self, domain: &str) -> Result<Arc<Vec<MxRecord>>, MxLookupError> {
        let ascii = resolver::normalize_domain(domain)?;
        if let Some(hit) = self.cache.get(&ascii) {
            return Ok(hit);
        }
        let records = Arc::new(resolver::resolve_with(self.lookup.as_ref(), &ascii).await?);
        self.cache.insert(&ascii, records.clone());
        Ok(records)
    }
}

#[cfg(test)]
mod tests;
