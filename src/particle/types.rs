use serde::{Deserialize, Serialize};

/// Globally unique particle identity, assigned by the creator.
///
/// Ids are non-negative and stay unique for the lifetime of the particle;
/// the system never hands out a freed interior id on its own.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId(pub i64);

impl ParticleId {
    pub fn is_valid(&self) -> bool {
        self.0 >= 0
    }
}

impl std::fmt::Display for ParticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One bonded interaction: the interaction type plus the partner particles.
///
/// Bonds are stored on exactly one of the involved particles and mutated only
/// through the per-id mutation protocol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bond {
    pub bond_type: i32,
    pub partners: Vec<ParticleId>,
}

/// The authoritative, mutable state of one particle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticleRecord {
    pub id: ParticleId,
    pub position: [f64; 3],
    /// Unit quaternion, scalar part first.
    pub orientation: [f64; 4],
    pub velocity: [f64; 3],
    pub omega: [f64; 3],
    pub force: [f64; 3],
    pub torque: [f64; 3],
    pub mass: f64,
    pub charge: f64,
    pub type_id: i32,
    pub mol_id: i32,
    pub bonds: Vec<Bond>,
    pub exclusions: Vec<ParticleId>,
}

impl ParticleRecord {
    pub fn new(id: ParticleId, position: [f64; 3]) -> Self {
        Self {
            id,
            position,
            orientation: [1.0, 0.0, 0.0, 0.0],
            velocity: [0.0; 3],
            omega: [0.0; 3],
            force: [0.0; 3],
            torque: [0.0; 3],
            mass: 1.0,
            charge: 0.0,
            type_id: 0,
            mol_id: 0,
            bonds: Vec::new(),
            exclusions: Vec::new(),
        }
    }

    pub fn add_bond(&mut self, bond: Bond) {
        self.bonds.push(bond);
    }

    /// Removes the first bond matching the full tuple. Removing a bond that
    /// is not present is a no-op.
    pub fn remove_bond(&mut self, bond: &Bond) {
        if let Some(pos) = self.bonds.iter().position(|b| b == bond) {
            self.bonds.remove(pos);
        }
    }

    pub fn clear_bonds(&mut self) {
        self.bonds.clear();
    }

    /// Drops every bond that involves `partner`. Used when the partner is
    /// removed from the system.
    pub fn strip_bonds_to(&mut self, partner: ParticleId) {
        self.bonds.retain(|b| !b.partners.contains(&partner));
    }

    /// Adds `partner` to the exclusion list, keeping it free of duplicates
    /// and self-references.
    pub fn add_exclusion(&mut self, partner: ParticleId) {
        if partner != self.id && !self.exclusions.contains(&partner) {
            self.exclusions.push(partner);
        }
    }

    pub fn remove_exclusion(&mut self, partner: ParticleId) {
        self.exclusions.retain(|p| *p != partner);
    }

    /// Rotates the orientation by `angle` radians around `axis`.
    pub fn rotate(&mut self, axis: [f64; 3], angle: f64) {
        let norm = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
        if norm == 0.0 {
            return;
        }
        let (s, c) = ((angle / 2.0).sin(), (angle / 2.0).cos());
        let dq = [
            c,
            s * axis[0] / norm,
            s * axis[1] / norm,
            s * axis[2] / norm,
        ];
        self.orientation = quat_mul(dq, self.orientation);
        normalize_quat(&mut self.orientation);
    }
}

/// Hamilton product `a * b`, scalar part first.
pub fn quat_mul(a: [f64; 4], b: [f64; 4]) -> [f64; 4] {
    [
        a[0] * b[0] - a[1] * b[1] - a[2] * b[2] - a[3] * b[3],
        a[0] * b[1] + a[1] * b[0] + a[2] * b[3] - a[3] * b[2],
        a[0] * b[2] - a[1] * b[3] + a[2] * b[0] + a[3] * b[1],
        a[0] * b[3] + a[1] * b[2] - a[2] * b[1] + a[3] * b[0],
    ]
}

fn normalize_quat(q: &mut [f64; 4]) {
    let norm = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
    if norm > 0.0 {
        for c in q.iter_mut() {
            *c /= norm;
        }
    }
}
