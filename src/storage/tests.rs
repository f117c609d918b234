//! Storage Module Tests
//!
//! Validates the swap-removal discipline and the exact synchronization
//! between cell storage and the id index under structural churn.

use crate::cluster::types::Rank;
use crate::error::ClusterError;
use crate::particle::types::{ParticleId, ParticleRecord};
use crate::storage::cells::Slot;
use crate::storage::decomposition::{Decomposition, SlabDecomposition};
use crate::storage::store::LocalStore;

fn record(id: i64) -> ParticleRecord {
    ParticleRecord::new(ParticleId(id), [0.0; 3])
}

/// Every resident id must resolve through the index to a slot whose record
/// carries that id.
fn assert_index_consistent(store: &LocalStore) {
    for id in store.ids() {
        let resolved = store.get(id).expect("index entry without record");
        assert_eq!(resolved.id, id, "index points at a foreign record");
    }
}

#[test]
fn insert_assigns_sequential_slots_within_a_cell() {
    let mut store = LocalStore::new(4);
    let s0 = store.insert(2, record(10)).unwrap();
    let s1 = store.insert(2, record(11)).unwrap();

    assert_eq!(s0, Slot { cell: 2, index: 0 });
    assert_eq!(s1, Slot { cell: 2, index: 1 });
    assert_eq!(store.len(), 2);
}

#[test]
fn duplicate_insert_is_rejected() {
    let mut store = LocalStore::new(1);
    store.insert(0, record(5)).unwrap();
    let err = store.insert(0, record(5)).unwrap_err();
    assert!(matches!(err, ClusterError::AlreadyExists(ParticleId(5))));
}

#[test]
fn swap_removal_repairs_the_displaced_entry() {
    let mut store = LocalStore::new(1);
    store.insert(0, record(1)).unwrap();
    store.insert(0, record(2)).unwrap();
    store.insert(0, record(3)).unwrap();

    // Removing the first record pulls id 3 into slot 0.
    let removed = store.remove(ParticleId(1)).unwrap();
    assert_eq!(removed.id, ParticleId(1));
    assert_eq!(
        store.slot_of(ParticleId(3)),
        Some(Slot { cell: 0, index: 0 })
    );
    assert_index_consistent(&store);
}

#[test]
fn removing_the_last_slot_displaces_nothing() {
    let mut store = LocalStore::new(1);
    store.insert(0, record(1)).unwrap();
    store.insert(0, record(2)).unwrap();

    store.remove(ParticleId(2)).unwrap();
    assert_eq!(
        store.slot_of(ParticleId(1)),
        Some(Slot { cell: 0, index: 0 })
    );
    assert_index_consistent(&store);
}

#[test]
fn remove_unknown_id_fails() {
    let mut store = LocalStore::new(1);
    let err = store.remove(ParticleId(9)).unwrap_err();
    assert!(matches!(err, ClusterError::UnknownId(ParticleId(9))));
}

#[test]
fn relocate_moves_between_cells_and_repairs_both_entries() {
    let mut store = LocalStore::new(2);
    store.insert(0, record(1)).unwrap();
    store.insert(0, record(2)).unwrap();
    store.insert(0, record(3)).unwrap();

    let dst = store.relocate(ParticleId(1), 1).unwrap();
    assert_eq!(dst, Slot { cell: 1, index: 0 });
    // Id 3 was swapped into the vacated slot in cell 0.
    assert_eq!(
        store.slot_of(ParticleId(3)),
        Some(Slot { cell: 0, index: 0 })
    );
    assert_index_consistent(&store);
}

#[test]
fn index_survives_heavy_structural_churn() {
    let mut store = LocalStore::new(3);
    for i in 0..30 {
        store.insert((i % 3) as usize, record(i)).unwrap();
    }
    // Interleave removals and relocations.
    for i in (0..30).step_by(3) {
        store.remove(ParticleId(i)).unwrap();
    }
    for i in (1..30).step_by(3) {
        store
            .relocate(ParticleId(i), ((i + 1) % 3) as usize)
            .unwrap();
    }

    assert_eq!(store.len(), 20);
    assert_index_consistent(&store);
}

#[test]
fn strip_bonds_to_touches_every_cell() {
    use crate::particle::types::Bond;

    let mut store = LocalStore::new(2);
    let mut a = record(1);
    a.add_bond(Bond {
        bond_type: 0,
        partners: vec![ParticleId(9)],
    });
    let mut b = record(2);
    b.add_bond(Bond {
        bond_type: 0,
        partners: vec![ParticleId(3)],
    });
    store.insert(0, a).unwrap();
    store.insert(1, b).unwrap();

    store.strip_bonds_to(ParticleId(9));
    assert!(store.get(ParticleId(1)).unwrap().bonds.is_empty());
    assert_eq!(store.get(ParticleId(2)).unwrap().bonds.len(), 1);
}

#[test]
fn slab_decomposition_partitions_the_box() {
    let decomp = SlabDecomposition::new([10.0, 10.0, 10.0], 4, 8);

    assert_eq!(decomp.rank_of(&[0.5, 0.0, 0.0]), Rank(0));
    assert_eq!(decomp.rank_of(&[9.5, 0.0, 0.0]), Rank(3));
    // Positions fold back into the box.
    assert_eq!(decomp.rank_of(&[10.5, 0.0, 0.0]), Rank(0));
    assert_eq!(decomp.rank_of(&[-0.5, 0.0, 0.0]), Rank(3));

    for y in 0..100 {
        let cell = decomp.cell_of(&[0.0, y as f64 / 10.0, 0.0]);
        assert!(cell < decomp.cell_count());
    }
}
