//! Distributed Particle Store Library
//!
//! This library crate implements the particle-ownership and mutation layer of
//! a distributed particle simulator: many cooperating ranks each hold a
//! disjoint partition of a global set of uniquely identified particle
//! records, and any rank can read or mutate a particle owned by another rank
//! without the dataset ever being materialized everywhere.
//!
//! ## Architecture Modules
//! The system is composed of the following subsystems:
//!
//! - **`particle`**: The data model. Particle identity, the authoritative
//!   record (position, orientation, momentum, force, bonds, exclusions) and
//!   the quaternion helpers behind orientation updates.
//! - **`storage`**: Rank-local storage. Spatial cells with O(1) swap-removal,
//!   the id index that keeps ids stable over the churn, and the decomposition
//!   collaborator that assigns positions to ranks and cells.
//! - **`directory`**: The replicated id-to-owner map, rebuilt lazily by a
//!   who-has exchange and dropped wholesale whenever ownership may change.
//! - **`mutation`**: The closed set of tagged mutation messages, each
//!   carrying exactly the data it needs and applied via one exhaustive match.
//! - **`cache`**: The bounded LRU cache of read-only remote snapshots.
//! - **`cluster`**: The per-rank service object, the two-phase mutation
//!   protocol (token broadcast, then point-to-point payload), the transport
//!   implementations and the HTTP API surface.

pub mod cache;
pub mod cluster;
pub mod directory;
pub mod error;
pub mod mutation;
pub mod particle;
pub mod storage;
