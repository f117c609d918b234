use std::time::Duration;

use async_trait::async_trait;

use crate::cluster::protocol::{ClusterReply, ClusterRequest, ENDPOINT_CLUSTER};
use crate::cluster::transport::Transport;
use crate::cluster::types::{Peer, Rank};
use crate::error::{ClusterError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const RETRY_ATTEMPTS: usize = 3;

/// HTTP transport over a static peer table, for multi-process deployments.
///
/// Every rank runs an axum server exposing the internal cluster endpoint;
/// requests go out as JSON POSTs through a shared client. Sends retry with
/// bounded exponential backoff; the op-id discipline on the receiving side
/// keeps retried payloads exactly-once.
pub struct HttpTransport {
    rank: Rank,
    peers: Vec<Peer>,
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// `peers` must contain every rank exactly once, including the local one.
    pub fn new(rank: Rank, mut peers: Vec<Peer>) -> Self {
        peers.sort_by_key(|p| p.rank);
        Self {
            rank,
            peers,
            http_client: reqwest::Client::new(),
        }
    }

    fn peer(&self, rank: Rank) -> Result<&Peer> {
        self.peers
            .iter()
            .find(|p| p.rank == rank)
            .ok_or_else(|| ClusterError::Transport(format!("no such rank {}", rank)))
    }

    async fn post_with_retry(&self, url: String, request: &ClusterRequest) -> Result<ClusterReply> {
        let mut delay_ms = 150u64;

        for attempt in 0..RETRY_ATTEMPTS {
            let response = self
                .http_client
                .post(url.clone())
                .json(request)
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    return resp
                        .json::<ClusterReply>()
                        .await
                        .map_err(|e| ClusterError::Serialization(e.to_string()));
                }
                Ok(resp) => {
                    return Err(ClusterError::Transport(format!(
                        "cluster call to {} failed: {}",
                        url,
                        resp.status()
                    )));
                }
                Err(e) => {
                    if attempt + 1 == RETRY_ATTEMPTS {
                        return Err(ClusterError::Transport(e.to_string()));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(ClusterError::Transport("retry attempts exhausted".into()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.peers.len()
    }

    async fn send(&self, to: Rank, request: ClusterRequest) -> Result<ClusterReply> {
        if to == self.rank {
            return Err(ClusterError::ProtocolViolation(format!(
                "rank {} tried to message itself",
                self.rank
            )));
        }
        let peer = self.peer(to)?;
        let url = format!("http://{}{}", peer.http_addr, ENDPOINT_CLUSTER);
        self.post_with_retry(url, &request).await
    }

    async fn broadcast(&self, request: ClusterRequest) -> Result<Vec<(Rank, ClusterReply)>> {
        let mut replies = Vec::with_capacity(self.peers.len().saturating_sub(1));
        for peer in &self.peers {
            if peer.rank == self.rank {
                continue;
            }
            let url = format!("http://{}{}", peer.http_addr, ENDPOINT_CLUSTER);
            let reply = self.post_with_retry(url, &request).await?;
            replies.push((peer.rank, reply));
        }
        Ok(replies)
    }
}
