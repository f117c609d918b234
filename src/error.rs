//! Error types for the particle cluster.

use thiserror::Error;

use crate::particle::types::ParticleId;

/// Errors surfaced by the ownership and mutation layer.
///
/// Id-validation errors (`InvalidId`, `UnknownId`, `AlreadyExists`) are
/// detected before any communication and are ordinary, recoverable results.
/// `ProtocolViolation` and `Transport` indicate that a collective step was
/// entered inconsistently or that the wire failed underneath it; the ranks
/// cannot be resynchronized after either, so callers should treat them as
/// fatal.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("invalid particle id {0}")]
    InvalidId(i64),

    #[error("particle {0} not found in the ownership directory")]
    UnknownId(ParticleId),

    #[error("particle {0} already exists")]
    AlreadyExists(ParticleId),

    #[error("collective step entered inconsistently: {0}")]
    ProtocolViolation(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("wire encoding failed: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, ClusterError>;
