use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
};
use std::sync::Arc;

use super::node::ClusterNode;
use super::protocol::{
    ClusterReply, ClusterRequest, IdsResponse, InsertRequest, MutateRequest, OpResponse,
    OwnerResponse, PrefetchRequest, ReadManyRequest, ReadManyResponse, ReadResponse,
    RelocateRequest,
};
use crate::error::ClusterError;
use crate::particle::types::ParticleId;

fn status_for(error: &ClusterError) -> StatusCode {
    match error {
        ClusterError::InvalidId(_) | ClusterError::AlreadyExists(_) => StatusCode::BAD_REQUEST,
        ClusterError::UnknownId(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn ok() -> (StatusCode, Json<OpResponse>) {
    (
        StatusCode::OK,
        Json(OpResponse {
            success: true,
            error: None,
        }),
    )
}

fn failed(error: ClusterError) -> (StatusCode, Json<OpResponse>) {
    (
        status_for(&error),
        Json(OpResponse {
            success: false,
            error: Some(error.to_string()),
        }),
    )
}

/// Internal endpoint: requests from peer ranks.
pub async fn handle_cluster(
    Extension(node): Extension<Arc<ClusterNode>>,
    Json(request): Json<ClusterRequest>,
) -> Json<ClusterReply> {
    Json(node.handle(request).await)
}

pub async fn handle_insert(
    Extension(node): Extension<Arc<ClusterNode>>,
    Json(req): Json<InsertRequest>,
) -> (StatusCode, Json<OpResponse>) {
    match node.insert(req.record).await {
        Ok(()) => ok(),
        Err(e) => {
            tracing::error!("insert failed: {}", e);
            failed(e)
        }
    }
}

pub async fn handle_read(
    Extension(node): Extension<Arc<ClusterNode>>,
    Path(id): Path<i64>,
) -> (StatusCode, Json<ReadResponse>) {
    match node.read(ParticleId(id)).await {
        Ok(record) => (
            StatusCode::OK,
            Json(ReadResponse {
                record: Some(record),
            }),
        ),
        Err(e) => {
            tracing::debug!("read of particle {} failed: {}", id, e);
            (status_for(&e), Json(ReadResponse { record: None }))
        }
    }
}

pub async fn handle_read_many(
    Extension(node): Extension<Arc<ClusterNode>>,
    Json(req): Json<ReadManyRequest>,
) -> (StatusCode, Json<ReadManyResponse>) {
    let ids: Vec<ParticleId> = req.ids.into_iter().map(ParticleId).collect();
    match node.read_many(&ids).await {
        Ok(records) => (StatusCode::OK, Json(ReadManyResponse { records })),
        Err(e) => {
            tracing::error!("batch read failed: {}", e);
            (
                status_for(&e),
                Json(ReadManyResponse {
                    records: Vec::new(),
                }),
            )
        }
    }
}

pub async fn handle_prefetch(
    Extension(node): Extension<Arc<ClusterNode>>,
    Json(req): Json<PrefetchRequest>,
) -> StatusCode {
    let ids: Vec<ParticleId> = req.ids.into_iter().map(ParticleId).collect();
    node.prefetch(&ids).await;
    StatusCode::ACCEPTED
}

pub async fn handle_mutate(
    Extension(node): Extension<Arc<ClusterNode>>,
    Json(req): Json<MutateRequest>,
) -> (StatusCode, Json<OpResponse>) {
    match node.mutate(ParticleId(req.id), req.message).await {
        Ok(()) => ok(),
        Err(e) => {
            tracing::error!("mutation of particle {} failed: {}", req.id, e);
            failed(e)
        }
    }
}

pub async fn handle_relocate(
    Extension(node): Extension<Arc<ClusterNode>>,
    Json(req): Json<RelocateRequest>,
) -> (StatusCode, Json<OpResponse>) {
    match node.relocate(ParticleId(req.id), req.position).await {
        Ok(()) => ok(),
        Err(e) => {
            tracing::error!("relocation of particle {} failed: {}", req.id, e);
            failed(e)
        }
    }
}

pub async fn handle_remove(
    Extension(node): Extension<Arc<ClusterNode>>,
    Path(id): Path<i64>,
) -> (StatusCode, Json<OpResponse>) {
    match node.remove(ParticleId(id)).await {
        Ok(()) => ok(),
        Err(e) => {
            tracing::error!("removal of particle {} failed: {}", id, e);
            failed(e)
        }
    }
}

pub async fn handle_owner(
    Extension(node): Extension<Arc<ClusterNode>>,
    Path(id): Path<i64>,
) -> (StatusCode, Json<OwnerResponse>) {
    match node.owner_of(ParticleId(id)).await {
        Ok(rank) => (StatusCode::OK, Json(OwnerResponse { rank: Some(rank.0) })),
        Err(e) => (status_for(&e), Json(OwnerResponse { rank: None })),
    }
}

pub async fn handle_ids(
    Extension(node): Extension<Arc<ClusterNode>>,
) -> (StatusCode, Json<IdsResponse>) {
    match node.all_ids().await {
        Ok(ids) => (
            StatusCode::OK,
            Json(IdsResponse {
                ids: ids.into_iter().map(|id| id.0).collect(),
            }),
        ),
        Err(e) => {
            tracing::error!("id listing failed: {}", e);
            (status_for(&e), Json(IdsResponse { ids: Vec::new() }))
        }
    }
}
