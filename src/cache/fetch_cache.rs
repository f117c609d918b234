use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::particle::types::{ParticleId, ParticleRecord};

/// Default byte budget for remote snapshots.
pub const DEFAULT_CACHE_BYTES: usize = 100 * 1024 * 1024;

/// LRU cache of remote particle snapshots.
///
/// The capacity is expressed as a byte budget and converted to an entry count
/// using the fixed per-record size. Exceeding the capacity is not an error;
/// the least-recently-used entry is evicted silently.
pub struct FetchCache {
    entries: Mutex<LruCache<ParticleId, ParticleRecord>>,
    max_entries: usize,
}

impl FetchCache {
    pub fn new(byte_budget: usize) -> Self {
        let max_entries = (byte_budget / std::mem::size_of::<ParticleRecord>()).max(1);
        Self::with_capacity(max_entries)
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            max_entries: capacity.get(),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cached snapshot and marks it most recently used.
    /// A miss does not trigger a fetch; that is the read path's job.
    pub fn get(&self, id: ParticleId) -> Option<ParticleRecord> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).get(&id).cloned()
    }

    /// Membership test without touching recency.
    pub fn has(&self, id: ParticleId) -> bool {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).contains(&id)
    }

    pub fn put(&self, id: ParticleId, record: ParticleRecord) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).put(id, record);
    }

    pub fn invalidate_all(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl std::fmt::Debug for FetchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCache")
            .field("len", &self.len())
            .field("max_entries", &self.max_entries)
            .finish()
    }
}
