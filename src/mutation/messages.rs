use serde::{Deserialize, Serialize};

use crate::particle::types::{Bond, ParticleId, ParticleRecord};

/// Scalar attribute updates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum PropertyUpdate {
    Type(i32),
    MolId(i32),
    Mass(f64),
    Charge(f64),
}

/// Spatial state updates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum PositionUpdate {
    Position([f64; 3]),
    Orientation([f64; 4]),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum MomentumUpdate {
    Velocity([f64; 3]),
    Omega([f64; 3]),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ForceUpdate {
    Force([f64; 3]),
    Torque([f64; 3]),
}

/// Bond list deltas. `Remove` matches the full tuple and ignores a missing
/// bond; `Clear` drops the whole list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum BondUpdate {
    Add(Bond),
    Remove(Bond),
    Clear,
}

/// Exclusion list deltas for one side of a pair; the symmetric public
/// operation issues one delta per partner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ExclusionUpdate {
    Add(ParticleId),
    Remove(ParticleId),
}

/// Top-level mutation message.
///
/// The set is closed: every way a record can change through the protocol is
/// one of these variants, and `apply` is the single dispatch point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum UpdateMessage {
    Property(PropertyUpdate),
    Position(PositionUpdate),
    Momentum(MomentumUpdate),
    Force(ForceUpdate),
    Bond(BondUpdate),
    Exclusion(ExclusionUpdate),
    RotateOrientation { axis: [f64; 3], angle: f64 },
}

impl UpdateMessage {
    pub fn apply(&self, record: &mut ParticleRecord) {
        match self {
            UpdateMessage::Property(update) => match update {
                PropertyUpdate::Type(v) => record.type_id = *v,
                PropertyUpdate::MolId(v) => record.mol_id = *v,
                PropertyUpdate::Mass(v) => record.mass = *v,
                PropertyUpdate::Charge(v) => record.charge = *v,
            },
            UpdateMessage::Position(update) => match update {
                PositionUpdate::Position(v) => record.position = *v,
                PositionUpdate::Orientation(v) => record.orientation = *v,
            },
            UpdateMessage::Momentum(update) => match update {
                MomentumUpdate::Velocity(v) => record.velocity = *v,
                MomentumUpdate::Omega(v) => record.omega = *v,
            },
            UpdateMessage::Force(update) => match update {
                ForceUpdate::Force(v) => record.force = *v,
                ForceUpdate::Torque(v) => record.torque = *v,
            },
            UpdateMessage::Bond(update) => match update {
                BondUpdate::Add(bond) => record.add_bond(bond.clone()),
                BondUpdate::Remove(bond) => record.remove_bond(bond),
                BondUpdate::Clear => record.clear_bonds(),
            },
            UpdateMessage::Exclusion(update) => match update {
                ExclusionUpdate::Add(partner) => record.add_exclusion(*partner),
                ExclusionUpdate::Remove(partner) => record.remove_exclusion(*partner),
            },
            UpdateMessage::RotateOrientation { axis, angle } => record.rotate(*axis, *angle),
        }
    }

    /// Short tag for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            UpdateMessage::Property(_) => "property",
            UpdateMessage::Position(_) => "position",
            UpdateMessage::Momentum(_) => "momentum",
            UpdateMessage::Force(_) => "force",
            UpdateMessage::Bond(_) => "bond",
            UpdateMessage::Exclusion(_) => "exclusion",
            UpdateMessage::RotateOrientation { .. } => "rotate",
        }
    }
}
