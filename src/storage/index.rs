use std::collections::HashMap;

use crate::particle::types::ParticleId;
use crate::storage::cells::Slot;

/// Rank-local mapping from particle id to its storage slot.
///
/// The index is what makes ids stable handles over the pointer-unstable
/// cell arrays: every structural change in `CellStore` (insert, swap-removal,
/// cross-cell move) must update the affected entries in the same logical
/// operation, including the entry of whichever record was displaced into the
/// freed slot.
#[derive(Debug, Default)]
pub struct LocalIndex {
    entries: HashMap<ParticleId, Slot>,
}

impl LocalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: ParticleId, slot: Slot) {
        self.entries.insert(id, slot);
    }

    pub fn get(&self, id: ParticleId) -> Option<Slot> {
        self.entries.get(&id).copied()
    }

    pub fn erase(&mut self, id: ParticleId) -> Option<Slot> {
        self.entries.remove(&id)
    }

    pub fn contains(&self, id: ParticleId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ParticleId> + '_ {
        self.entries.keys().copied()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
