//! Cache Module Tests

use crate::cache::fetch_cache::FetchCache;
use crate::particle::types::{ParticleId, ParticleRecord};

fn snapshot(id: i64) -> ParticleRecord {
    ParticleRecord::new(ParticleId(id), [id as f64, 0.0, 0.0])
}

#[test]
fn byte_budget_translates_to_entry_count() {
    let per_record = std::mem::size_of::<ParticleRecord>();
    let cache = FetchCache::new(10 * per_record);
    assert_eq!(cache.max_entries(), 10);

    // A budget below one record still holds a single entry.
    let tiny = FetchCache::new(1);
    assert_eq!(tiny.max_entries(), 1);
}

#[test]
fn resident_count_never_exceeds_capacity() {
    let cache = FetchCache::with_capacity(4);
    for id in 0..20 {
        cache.put(ParticleId(id), snapshot(id));
    }
    assert_eq!(cache.len(), 4);
}

#[test]
fn least_recently_used_entries_evict_first() {
    let cache = FetchCache::with_capacity(3);
    cache.put(ParticleId(1), snapshot(1));
    cache.put(ParticleId(2), snapshot(2));
    cache.put(ParticleId(3), snapshot(3));

    // Touch 1 so that 2 becomes the oldest.
    assert!(cache.get(ParticleId(1)).is_some());
    cache.put(ParticleId(4), snapshot(4));

    assert!(cache.has(ParticleId(1)));
    assert!(!cache.has(ParticleId(2)));
    assert!(cache.has(ParticleId(3)));
    assert!(cache.has(ParticleId(4)));
}

#[test]
fn has_does_not_promote() {
    let cache = FetchCache::with_capacity(2);
    cache.put(ParticleId(1), snapshot(1));
    cache.put(ParticleId(2), snapshot(2));

    // `has` must not refresh id 1, so it is still the eviction candidate.
    assert!(cache.has(ParticleId(1)));
    cache.put(ParticleId(3), snapshot(3));

    assert!(!cache.has(ParticleId(1)));
    assert!(cache.has(ParticleId(2)));
}

#[test]
fn get_miss_returns_absent_without_side_effects() {
    let cache = FetchCache::with_capacity(2);
    assert!(cache.get(ParticleId(9)).is_none());
    assert!(cache.is_empty());
}

#[test]
fn invalidate_all_flushes_everything() {
    let cache = FetchCache::with_capacity(8);
    for id in 0..5 {
        cache.put(ParticleId(id), snapshot(id));
    }
    cache.invalidate_all();
    assert!(cache.is_empty());
    assert!(!cache.has(ParticleId(0)));
}
