//! Mutation Message Tests

use crate::mutation::messages::*;
use crate::particle::types::{Bond, ParticleId, ParticleRecord};

fn record() -> ParticleRecord {
    ParticleRecord::new(ParticleId(1), [1.0, 2.0, 3.0])
}

#[test]
fn property_updates_hit_their_fields() {
    let mut p = record();
    UpdateMessage::Property(PropertyUpdate::Mass(2.5)).apply(&mut p);
    UpdateMessage::Property(PropertyUpdate::Charge(-1.0)).apply(&mut p);
    UpdateMessage::Property(PropertyUpdate::Type(3)).apply(&mut p);
    UpdateMessage::Property(PropertyUpdate::MolId(7)).apply(&mut p);

    assert_eq!(p.mass, 2.5);
    assert_eq!(p.charge, -1.0);
    assert_eq!(p.type_id, 3);
    assert_eq!(p.mol_id, 7);
}

#[test]
fn kinematic_updates_replace_whole_vectors() {
    let mut p = record();
    UpdateMessage::Position(PositionUpdate::Position([9.0, 8.0, 7.0])).apply(&mut p);
    UpdateMessage::Momentum(MomentumUpdate::Velocity([0.1, 0.2, 0.3])).apply(&mut p);
    UpdateMessage::Force(ForceUpdate::Torque([1.0, 0.0, 0.0])).apply(&mut p);

    assert_eq!(p.position, [9.0, 8.0, 7.0]);
    assert_eq!(p.velocity, [0.1, 0.2, 0.3]);
    assert_eq!(p.torque, [1.0, 0.0, 0.0]);
}

#[test]
fn bond_deltas_add_remove_and_clear() {
    let mut p = record();
    let pair = Bond {
        bond_type: 0,
        partners: vec![ParticleId(2)],
    };
    let angle = Bond {
        bond_type: 1,
        partners: vec![ParticleId(2), ParticleId(3)],
    };

    UpdateMessage::Bond(BondUpdate::Add(pair.clone())).apply(&mut p);
    UpdateMessage::Bond(BondUpdate::Add(angle.clone())).apply(&mut p);
    assert_eq!(p.bonds.len(), 2);

    UpdateMessage::Bond(BondUpdate::Remove(pair)).apply(&mut p);
    assert_eq!(p.bonds, vec![angle]);

    UpdateMessage::Bond(BondUpdate::Clear).apply(&mut p);
    assert!(p.bonds.is_empty());
}

#[test]
fn removing_an_absent_bond_is_a_no_op() {
    let mut p = record();
    UpdateMessage::Bond(BondUpdate::Remove(Bond {
        bond_type: 4,
        partners: vec![ParticleId(5)],
    }))
    .apply(&mut p);
    assert!(p.bonds.is_empty());
}

#[test]
fn rotation_message_matches_direct_rotation() {
    let mut via_message = record();
    let mut direct = record();

    let axis = [0.0, 1.0, 0.0];
    let angle = 0.7;
    UpdateMessage::RotateOrientation { axis, angle }.apply(&mut via_message);
    direct.rotate(axis, angle);

    assert_eq!(via_message.orientation, direct.orientation);
}

#[test]
fn messages_survive_the_wire() {
    let msg = UpdateMessage::Bond(BondUpdate::Add(Bond {
        bond_type: 2,
        partners: vec![ParticleId(4), ParticleId(5)],
    }));

    let bytes = bincode::serialize(&msg).unwrap();
    let back: UpdateMessage = bincode::deserialize(&bytes).unwrap();
    assert_eq!(back, msg);

    let json = serde_json::to_string(&msg).unwrap();
    let back: UpdateMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(back, msg);
}
