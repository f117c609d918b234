use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::cluster::node::ClusterNode;
use crate::cluster::protocol::{ClusterReply, ClusterRequest};
use crate::cluster::transport::Transport;
use crate::cluster::types::{NodeConfig, Rank};
use crate::error::{ClusterError, Result};
use crate::storage::decomposition::SlabDecomposition;

/// One encoded request plus the channel its encoded reply goes back on.
type Frame = (Vec<u8>, oneshot::Sender<Vec<u8>>);

/// In-process transport: every rank lives in the same process and messages
/// travel as bincode frames through per-rank inbox channels. Used by the test
/// suite and single-process multi-rank runs.
pub struct LocalTransport {
    rank: Rank,
    inboxes: Vec<mpsc::UnboundedSender<Frame>>,
}

impl LocalTransport {
    fn new(rank: Rank, inboxes: Vec<mpsc::UnboundedSender<Frame>>) -> Self {
        Self { rank, inboxes }
    }
}

#[async_trait]
impl Transport for LocalTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.inboxes.len()
    }

    async fn send(&self, to: Rank, request: ClusterRequest) -> Result<ClusterReply> {
        if to == self.rank {
            return Err(ClusterError::ProtocolViolation(format!(
                "rank {} tried to message itself",
                self.rank
            )));
        }
        let inbox = self
            .inboxes
            .get(to.0 as usize)
            .ok_or_else(|| ClusterError::Transport(format!("no such rank {}", to)))?;

        let bytes =
            bincode::serialize(&request).map_err(|e| ClusterError::Serialization(e.to_string()))?;
        let (reply_tx, reply_rx) = oneshot::channel();
        inbox
            .send((bytes, reply_tx))
            .map_err(|_| ClusterError::Transport(format!("rank {} is gone", to)))?;

        let reply_bytes = reply_rx
            .await
            .map_err(|_| ClusterError::Transport(format!("rank {} dropped the reply", to)))?;
        bincode::deserialize(&reply_bytes).map_err(|e| ClusterError::Serialization(e.to_string()))
    }

    async fn broadcast(&self, request: ClusterRequest) -> Result<Vec<(Rank, ClusterReply)>> {
        let mut replies = Vec::with_capacity(self.inboxes.len().saturating_sub(1));
        for rank in 0..self.inboxes.len() {
            let rank = Rank(rank as u32);
            if rank == self.rank {
                continue;
            }
            let reply = self.send(rank, request.clone()).await?;
            replies.push((rank, reply));
        }
        Ok(replies)
    }
}

/// Builds a fully wired in-process cluster of `world_size` ranks over a slab
/// decomposition and spawns one dispatch worker per rank.
pub fn spawn_local_cluster(world_size: usize, config: NodeConfig) -> Vec<Arc<ClusterNode>> {
    assert!(world_size > 0);

    let mut senders = Vec::with_capacity(world_size);
    let mut receivers = Vec::with_capacity(world_size);
    for _ in 0..world_size {
        let (tx, rx) = mpsc::unbounded_channel();
        senders.push(tx);
        receivers.push(rx);
    }

    let mut nodes = Vec::with_capacity(world_size);
    for (rank, inbox) in receivers.into_iter().enumerate() {
        let transport = Arc::new(LocalTransport::new(Rank(rank as u32), senders.clone()));
        let decomposition = Arc::new(SlabDecomposition::new(
            config.box_length,
            world_size,
            config.cells_per_rank,
        ));
        let node = ClusterNode::new(&config, decomposition, transport);
        spawn_dispatch_worker(node.clone(), inbox);
        nodes.push(node);
    }
    nodes
}

/// Per-rank dispatch loop: decode a frame, run the node's handler, send the
/// encoded reply back. Frames from one sender are handled in arrival order,
/// which is what keeps a token ahead of its payload.
fn spawn_dispatch_worker(node: Arc<ClusterNode>, mut inbox: mpsc::UnboundedReceiver<Frame>) {
    tokio::spawn(async move {
        while let Some((bytes, reply_tx)) = inbox.recv().await {
            let request: ClusterRequest = match bincode::deserialize(&bytes) {
                Ok(request) => request,
                Err(e) => {
                    tracing::error!("rank {}: undecodable frame: {}", node.rank(), e);
                    continue;
                }
            };
            let reply = node.handle(request).await;
            match bincode::serialize(&reply) {
                Ok(encoded) => {
                    // A dropped receiver means the sender gave up; nothing to do.
                    let _ = reply_tx.send(encoded);
                }
                Err(e) => {
                    tracing::error!("rank {}: failed to encode reply: {}", node.rank(), e);
                }
            }
        }
    });
}
