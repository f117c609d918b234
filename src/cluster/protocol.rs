//! Cluster Network Protocol
//!
//! Defines the internal rank-to-rank messages and the public API endpoints
//! plus their Data Transfer Objects.
//!
//! Every mutating operation is two-phased: an `Enter*` token is delivered to
//! every rank first, so all ranks walk the same handler path, then the actual
//! payload (if any) travels point-to-point to the rank that has to act on it.
//! Point-to-point payloads carry an `op_id` so that transport-level retries
//! stay exactly-once.

use serde::{Deserialize, Serialize};

use crate::cluster::types::Rank;
use crate::mutation::messages::UpdateMessage;
use crate::particle::types::{ParticleId, ParticleRecord};

// --- API Endpoints ---

/// Internal endpoint carrying all rank-to-rank `ClusterRequest`s.
pub const ENDPOINT_CLUSTER: &str = "/internal/cluster";
/// Public endpoint for placing a new particle.
pub const ENDPOINT_INSERT: &str = "/particles";
/// Public endpoint for reading/removing one particle by id.
pub const ENDPOINT_PARTICLE: &str = "/particles/:id";
/// Public endpoint for the unordered batch read.
pub const ENDPOINT_READ_MANY: &str = "/particles/read_many";
/// Public endpoint for warming the snapshot cache.
pub const ENDPOINT_PREFETCH: &str = "/particles/prefetch";
/// Public endpoint for applying one tagged mutation.
pub const ENDPOINT_MUTATE: &str = "/mutate";
/// Public endpoint for rebinning a particle to a new position.
pub const ENDPOINT_RELOCATE: &str = "/relocate";
/// Public endpoint resolving the owning rank of an id.
pub const ENDPOINT_OWNER: &str = "/owner/:id";
/// Public endpoint listing all particle ids, sorted.
pub const ENDPOINT_IDS: &str = "/ids";

// --- Internal rank-to-rank messages ---

/// Requests exchanged between ranks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClusterRequest {
    /// Every-rank token of a mutation call; precedes the payload.
    EnterMutation {
        op_id: String,
        id: ParticleId,
        owner: Rank,
    },
    /// Mutation payload, point-to-point to the owner.
    ApplyMutation {
        op_id: String,
        id: ParticleId,
        message: UpdateMessage,
    },
    /// Every-rank token of a placement; ranks patch their directories.
    EnterPlace {
        op_id: String,
        id: ParticleId,
        owner: Rank,
    },
    /// Point-to-point transfer of a new or migrating record to its owner.
    DepositRecord {
        op_id: String,
        record: ParticleRecord,
    },
    /// Every-rank token of a removal; ranks drop the directory entry and
    /// strip bonds referencing the id, the owner extracts the record.
    EnterRemove {
        op_id: String,
        id: ParticleId,
        owner: Rank,
    },
    /// Every-rank token clearing the whole particle system.
    EnterRemoveAll { op_id: String },
    /// Every-rank token of a migration; ownership may change, so every rank
    /// drops its directory wholesale. `from`/`to` name the ranks that will
    /// act on the record; their hooks fire with the payload, not the token.
    EnterRebin {
        op_id: String,
        id: ParticleId,
        from: Rank,
        to: Rank,
    },
    /// Cell-to-cell move on the owning rank, no ownership change.
    RebinLocal {
        op_id: String,
        id: ParticleId,
        position: [f64; 3],
    },
    /// Extracts a migrating record from its current owner.
    ExtractRecord {
        op_id: String,
        id: ParticleId,
        position: [f64; 3],
    },
    /// Synchronous single-id fetch from the owner.
    FetchOne { id: ParticleId },
    /// Batch fetch of locally owned records.
    FetchMany { ids: Vec<ParticleId> },
    /// Directory rebuild: report the resident id set.
    WhoHas,
}

/// Replies to `ClusterRequest`s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClusterReply {
    Ack,
    Record(ParticleRecord),
    NotFound(ParticleId),
    Records(Vec<ParticleRecord>),
    Owned(Vec<ParticleId>),
    /// The handler could not perform its share of a collective step. The
    /// initiator treats this as a protocol violation.
    Error(String),
}

// --- Public API Data Transfer Objects ---

/// Client request for placing a new particle.
#[derive(Debug, Serialize, Deserialize)]
pub struct InsertRequest {
    pub record: ParticleRecord,
}

/// Standard acknowledgment for mutating operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct OpResponse {
    pub success: bool,
    /// Set when `success` is false.
    pub error: Option<String>,
}

/// Response for single-particle reads.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadResponse {
    pub record: Option<ParticleRecord>,
}

/// Client request for an unordered batch read.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadManyRequest {
    pub ids: Vec<i64>,
}

/// Batch read result. Records arrive in arbitrary order; callers needing
/// order re-key by id.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadManyResponse {
    pub records: Vec<ParticleRecord>,
}

/// Client request for warming the snapshot cache.
#[derive(Debug, Serialize, Deserialize)]
pub struct PrefetchRequest {
    pub ids: Vec<i64>,
}

/// Client request for one tagged mutation.
#[derive(Debug, Serialize, Deserialize)]
pub struct MutateRequest {
    pub id: i64,
    pub message: UpdateMessage,
}

/// Client request for rebinning a particle to a new position.
#[derive(Debug, Serialize, Deserialize)]
pub struct RelocateRequest {
    pub id: i64,
    pub position: [f64; 3],
}

/// Owner lookup result.
#[derive(Debug, Serialize, Deserialize)]
pub struct OwnerResponse {
    pub rank: Option<u32>,
}

/// Sorted list of every particle id in the system.
#[derive(Debug, Serialize, Deserialize)]
pub struct IdsResponse {
    pub ids: Vec<i64>,
}
