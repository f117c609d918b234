use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use particle_cluster::cluster::handlers::*;
use particle_cluster::cluster::http::HttpTransport;
use particle_cluster::cluster::node::ClusterNode;
use particle_cluster::cluster::protocol::*;
use particle_cluster::cluster::types::{NodeConfig, Peer, Rank};
use particle_cluster::storage::decomposition::SlabDecomposition;
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!(
            "Usage: {} --rank <n> --peers <addr0,addr1,...> [--cache-mb <n>] [--box <x,y,z>] [--cells <n>]",
            args[0]
        );
        eprintln!(
            "Example: {} --rank 0 --peers 127.0.0.1:6000,127.0.0.1:6001",
            args[0]
        );
        std::process::exit(1);
    }

    let mut rank: Option<u32> = None;
    let mut peer_addrs: Vec<SocketAddr> = vec![];
    let mut config = NodeConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--rank" => {
                rank = Some(args[i + 1].parse()?);
                i += 2;
            }
            "--peers" => {
                for addr in args[i + 1].split(',') {
                    peer_addrs.push(addr.parse()?);
                }
                i += 2;
            }
            "--cache-mb" => {
                let mb: usize = args[i + 1].parse()?;
                config.cache_bytes = mb * 1024 * 1024;
                i += 2;
            }
            "--box" => {
                let lengths: Vec<f64> = args[i + 1]
                    .split(',')
                    .map(|l| l.parse())
                    .collect::<Result<_, _>>()?;
                anyhow::ensure!(lengths.len() == 3, "--box takes three lengths");
                config.box_length = [lengths[0], lengths[1], lengths[2]];
                i += 2;
            }
            "--cells" => {
                config.cells_per_rank = args[i + 1].parse()?;
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    let rank = Rank(rank.ok_or_else(|| anyhow::anyhow!("--rank is required"))?);
    anyhow::ensure!(!peer_addrs.is_empty(), "--peers is required");
    anyhow::ensure!(
        (rank.0 as usize) < peer_addrs.len(),
        "--rank must index into --peers"
    );

    let peers: Vec<Peer> = peer_addrs
        .iter()
        .enumerate()
        .map(|(r, addr)| Peer {
            rank: Rank(r as u32),
            http_addr: *addr,
        })
        .collect();
    let bind_addr = peers[rank.0 as usize].http_addr;

    tracing::info!(
        "Starting rank {} of {} on {}",
        rank,
        peers.len(),
        bind_addr
    );

    // 1. Decomposition and transport over the static peer table:
    let world_size = peers.len();
    let decomposition = Arc::new(SlabDecomposition::new(
        config.box_length,
        world_size,
        config.cells_per_rank,
    ));
    let transport = Arc::new(HttpTransport::new(rank, peers));

    // 2. The per-rank store node:
    let node = ClusterNode::new(&config, decomposition, transport);
    node.set_change_hook(Arc::new(|| {
        tracing::trace!("particle changed");
    }));

    // 3. HTTP Router:
    let app = Router::new()
        .route(ENDPOINT_CLUSTER, post(handle_cluster))
        .route(ENDPOINT_INSERT, post(handle_insert))
        .route(ENDPOINT_PARTICLE, get(handle_read).delete(handle_remove))
        .route(ENDPOINT_READ_MANY, post(handle_read_many))
        .route(ENDPOINT_PREFETCH, post(handle_prefetch))
        .route(ENDPOINT_MUTATE, post(handle_mutate))
        .route(ENDPOINT_RELOCATE, post(handle_relocate))
        .route(ENDPOINT_OWNER, get(handle_owner))
        .route(ENDPOINT_IDS, get(handle_ids))
        .layer(Extension(node.clone()));

    // 4. Spawn stats reporter:
    let stats_node = node.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(5));

        loop {
            interval.tick().await;
            tracing::info!(
                "Node stats: {} resident particles, {} directory entries (built={}), {} cached snapshots",
                stats_node.resident_count().await,
                stats_node.directory().len(),
                stats_node.directory().is_built(),
                stats_node.cache().len()
            );
        }
    });

    // 5. Start HTTP server:
    tracing::info!("HTTP server listening on {}", bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
