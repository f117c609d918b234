use crate::error::{ClusterError, Result};
use crate::particle::types::{ParticleId, ParticleRecord};
use crate::storage::cells::{CellStore, Slot};
use crate::storage::index::LocalIndex;

/// The per-rank store: bucketed cell storage plus the id index, kept exactly
/// synchronized through every structural change.
///
/// All operations here are rank-local. Records never cross a rank boundary
/// through this type; migration extracts a record here and deposits it into
/// the destination rank's own store.
#[derive(Debug)]
pub struct LocalStore {
    cells: CellStore,
    index: LocalIndex,
}

impl LocalStore {
    pub fn new(cell_count: usize) -> Self {
        Self {
            cells: CellStore::new(cell_count),
            index: LocalIndex::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: ParticleId) -> bool {
        self.index.contains(id)
    }

    pub fn insert(&mut self, cell: usize, record: ParticleRecord) -> Result<Slot> {
        let id = record.id;
        if self.index.contains(id) {
            return Err(ClusterError::AlreadyExists(id));
        }
        let slot = self.cells.push(cell, record);
        self.index.set(id, slot);
        Ok(slot)
    }

    /// Extracts the record with `id`, repairing the index entry of whichever
    /// record was swapped into the freed slot.
    pub fn remove(&mut self, id: ParticleId) -> Result<ParticleRecord> {
        let slot = self.index.erase(id).ok_or(ClusterError::UnknownId(id))?;
        let (record, displaced) = self.cells.swap_remove(slot);
        if let Some(moved) = displaced {
            self.index.set(moved, slot);
        }
        Ok(record)
    }

    /// Moves the record with `id` into `dst_cell` on this rank.
    pub fn relocate(&mut self, id: ParticleId, dst_cell: usize) -> Result<Slot> {
        let slot = self.index.get(id).ok_or(ClusterError::UnknownId(id))?;
        let (dst, displaced) = self.cells.move_between(slot, dst_cell);
        self.index.set(id, dst);
        if let Some(moved) = displaced {
            self.index.set(moved, slot);
        }
        Ok(dst)
    }

    pub fn get(&self, id: ParticleId) -> Option<&ParticleRecord> {
        self.index.get(id).and_then(|slot| self.cells.get(slot))
    }

    pub fn get_mut(&mut self, id: ParticleId) -> Option<&mut ParticleRecord> {
        let slot = self.index.get(id)?;
        self.cells.get_mut(slot)
    }

    pub fn slot_of(&self, id: ParticleId) -> Option<Slot> {
        self.index.get(id)
    }

    pub fn ids(&self) -> Vec<ParticleId> {
        self.index.ids().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParticleRecord> {
        self.cells.iter()
    }

    /// Strips every bond referencing `partner` from the records resident on
    /// this rank. Called on every rank when a particle is removed.
    pub fn strip_bonds_to(&mut self, partner: ParticleId) {
        for record in self.cells.iter_mut() {
            record.strip_bonds_to(partner);
        }
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.index.clear();
    }
}
