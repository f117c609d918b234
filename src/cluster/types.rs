use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::cache::fetch_cache::DEFAULT_CACHE_BYTES;

/// One cooperating compute rank.
///
/// Ranks are dense indices `0..world_size`, fixed for the lifetime of a run;
/// the cluster neither grows nor shrinks while a simulation is running.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rank(pub u32);

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A cluster member in the static peer table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Peer {
    pub rank: Rank,
    pub http_addr: SocketAddr,
}

/// Per-rank configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Byte budget for the remote snapshot cache; converted internally into
    /// an entry count.
    pub cache_bytes: usize,
    /// Edge lengths of the periodic simulation box.
    pub box_length: [f64; 3],
    /// Local cells per rank, as dictated by the decomposition.
    pub cells_per_rank: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            cache_bytes: DEFAULT_CACHE_BYTES,
            box_length: [10.0, 10.0, 10.0],
            cells_per_rank: 8,
        }
    }
}
