use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use dashmap::DashMap;

use crate::cluster::types::Rank;
use crate::error::{ClusterError, Result};
use crate::particle::types::ParticleId;

/// The id-to-owner map held by every rank.
///
/// Consistency contract: once built, entries reflect true ownership until the
/// next structural mutation anywhere in the system. Inserts and removals
/// carry the exact owner and patch the map; migrations only `invalidate`,
/// because rebinning is a local decision that is never announced per id, and
/// the next lookup pays for one full rebuild.
pub struct Directory {
    entries: DashMap<ParticleId, Rank>,
    built: AtomicBool,
    /// Highest id ever assigned, or -1 when no particle was ever seen.
    /// Removing the current maximum decrements it by exactly one; a rebuild
    /// recomputes it from live ids.
    max_seen: AtomicI64,
}

impl Directory {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            built: AtomicBool::new(false),
            max_seen: AtomicI64::new(-1),
        }
    }

    pub fn is_built(&self) -> bool {
        self.built.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn max_seen(&self) -> i64 {
        self.max_seen.load(Ordering::Acquire)
    }

    /// Rejects ids that can be ruled out without any communication.
    pub fn validate(&self, id: ParticleId) -> Result<()> {
        if !id.is_valid() || id.0 > self.max_seen() {
            return Err(ClusterError::InvalidId(id.0));
        }
        Ok(())
    }

    pub fn lookup(&self, id: ParticleId) -> Option<Rank> {
        self.entries.get(&id).map(|entry| *entry.value())
    }

    pub fn contains(&self, id: ParticleId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Installs the merged result of a who-has exchange.
    pub fn install(&self, reports: impl IntoIterator<Item = (Rank, Vec<ParticleId>)>) {
        self.entries.clear();
        let mut max = -1;
        for (rank, ids) in reports {
            for id in ids {
                max = max.max(id.0);
                self.entries.insert(id, rank);
            }
        }
        self.max_seen.store(max, Ordering::Release);
        self.built.store(true, Ordering::Release);
    }

    /// Exact-owner patch for a freshly placed particle.
    pub fn note_insert(&self, id: ParticleId, owner: Rank) {
        self.entries.insert(id, owner);
        self.max_seen.fetch_max(id.0, Ordering::AcqRel);
    }

    /// Exact patch for a removal.
    pub fn note_remove(&self, id: ParticleId) {
        self.entries.remove(&id);
        // The top id becomes assignable again; interior ids stay burned.
        let _ = self
            .max_seen
            .compare_exchange(id.0, id.0 - 1, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Drops the whole map; the next lookup triggers a rebuild.
    pub fn invalidate(&self) {
        self.entries.clear();
        self.built.store(false, Ordering::Release);
    }

    /// Full reset, including the highest-seen counter. Used when every
    /// particle is removed.
    pub fn reset(&self) {
        self.entries.clear();
        self.max_seen.store(-1, Ordering::Release);
        self.built.store(true, Ordering::Release);
    }

    pub fn ids_sorted(&self) -> Vec<ParticleId> {
        let mut ids: Vec<ParticleId> = self.entries.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_before_any_install_sees_nothing() {
        let dir = Directory::new();
        assert!(!dir.is_built());
        assert_eq!(dir.lookup(ParticleId(0)), None);
        assert_eq!(dir.max_seen(), -1);
    }

    #[test]
    fn install_merges_reports_and_tracks_the_maximum() {
        let dir = Directory::new();
        dir.install(vec![
            (Rank(0), vec![ParticleId(0), ParticleId(4)]),
            (Rank(1), vec![ParticleId(2)]),
        ]);

        assert!(dir.is_built());
        assert_eq!(dir.lookup(ParticleId(4)), Some(Rank(0)));
        assert_eq!(dir.lookup(ParticleId(2)), Some(Rank(1)));
        assert_eq!(dir.max_seen(), 4);
        assert_eq!(
            dir.ids_sorted(),
            vec![ParticleId(0), ParticleId(2), ParticleId(4)]
        );
    }

    #[test]
    fn validate_rejects_negative_and_never_assigned_ids() {
        let dir = Directory::new();
        dir.install(vec![(Rank(0), vec![ParticleId(3)])]);

        assert!(dir.validate(ParticleId(-1)).is_err());
        assert!(dir.validate(ParticleId(4)).is_err());
        assert!(dir.validate(ParticleId(3)).is_ok());
        // Id 0 was never assigned but is within range; the lookup decides.
        assert!(dir.validate(ParticleId(0)).is_ok());
    }

    #[test]
    fn removing_the_maximum_frees_exactly_that_id() {
        let dir = Directory::new();
        dir.install(vec![(Rank(0), vec![ParticleId(1), ParticleId(5)])]);

        dir.note_remove(ParticleId(5));
        assert_eq!(dir.max_seen(), 4);

        // Removing an interior id leaves the counter alone.
        dir.note_remove(ParticleId(1));
        assert_eq!(dir.max_seen(), 4);
    }

    #[test]
    fn invalidate_clears_entries_but_keeps_the_counter() {
        let dir = Directory::new();
        dir.install(vec![(Rank(2), vec![ParticleId(7)])]);

        dir.invalidate();
        assert!(!dir.is_built());
        assert_eq!(dir.lookup(ParticleId(7)), None);
        assert_eq!(dir.max_seen(), 7);
    }
}
