use async_trait::async_trait;

use crate::cluster::protocol::{ClusterReply, ClusterRequest};
use crate::cluster::types::Rank;
use crate::error::Result;

/// The narrow transport collaborator.
///
/// Two primitives carry the whole protocol: a collective `broadcast` that
/// makes every other rank enter the same handler path (the initiator handles
/// its own share inline), and a point-to-point `send` for payloads addressed
/// to a single rank. Both are synchronous request/reply exchanges; a call
/// returns only once the receiving side has run its handler.
///
/// The transport is assumed reliable. A rank that never answers does not time
/// out here; it stalls the collective, which is a fatal program defect rather
/// than a recoverable error.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    fn rank(&self) -> Rank;

    fn world_size(&self) -> usize;

    /// Point-to-point request/reply with a single other rank.
    async fn send(&self, to: Rank, request: ClusterRequest) -> Result<ClusterReply>;

    /// Delivers `request` to every other rank and collects one reply per
    /// rank. The token step of every mutating operation goes through here.
    async fn broadcast(&self, request: ClusterRequest) -> Result<Vec<(Rank, ClusterReply)>>;
}
