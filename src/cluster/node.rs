use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::cache::fetch_cache::FetchCache;
use crate::cluster::protocol::{ClusterReply, ClusterRequest};
use crate::cluster::transport::Transport;
use crate::cluster::types::{NodeConfig, Rank};
use crate::directory::service::Directory;
use crate::error::{ClusterError, Result};
use crate::mutation::messages::{
    BondUpdate, ExclusionUpdate, ForceUpdate, MomentumUpdate, PositionUpdate, PropertyUpdate,
    UpdateMessage,
};
use crate::particle::types::{Bond, ParticleId, ParticleRecord};
use crate::storage::decomposition::Decomposition;
use crate::storage::store::LocalStore;

/// Hook invoked on every rank after a successful structural change or
/// mutation. Consumed by collaborators that cache derived quantities.
pub type ChangeHook = Arc<dyn Fn() + Send + Sync>;

/// The per-rank service object of the particle store.
///
/// Owns this rank's `LocalStore`, its replica of the ownership `Directory`
/// and the remote snapshot cache, and drives every operation of the public
/// API through the two-phase protocol: token broadcast first, payload
/// point-to-point second. `handle` is the single entry point for requests
/// arriving from other ranks; handlers only touch rank-local state and never
/// issue nested collectives, which is what keeps concurrent calls from
/// different ranks deadlock-free.
pub struct ClusterNode {
    transport: Arc<dyn Transport>,
    decomposition: Arc<dyn Decomposition>,
    store: RwLock<LocalStore>,
    directory: Directory,
    cache: FetchCache,
    /// Operation ids already handled, for exactly-once payload application
    /// under transport-level retries.
    processed_ops: DashMap<String, u64>,
    change_hook: std::sync::RwLock<Option<ChangeHook>>,
}

impl ClusterNode {
    pub fn new(
        config: &NodeConfig,
        decomposition: Arc<dyn Decomposition>,
        transport: Arc<dyn Transport>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store: RwLock::new(LocalStore::new(decomposition.cell_count())),
            cache: FetchCache::new(config.cache_bytes),
            directory: Directory::new(),
            processed_ops: DashMap::new(),
            change_hook: std::sync::RwLock::new(None),
            decomposition,
            transport,
        })
    }

    pub fn rank(&self) -> Rank {
        self.transport.rank()
    }

    pub fn world_size(&self) -> usize {
        self.transport.world_size()
    }

    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub async fn resident_count(&self) -> usize {
        self.store.read().await.len()
    }

    /// Registers the particle-changed notification hook.
    pub fn set_change_hook(&self, hook: ChangeHook) {
        *self.change_hook.write().unwrap_or_else(|e| e.into_inner()) = Some(hook);
    }

    fn particle_changed(&self) {
        let hook = self
            .change_hook
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    fn should_process(&self, op_key: &str) -> bool {
        if self.processed_ops.contains_key(op_key) {
            return false;
        }
        if self.processed_ops.len() > 10_000 {
            self.processed_ops.clear();
        }
        self.processed_ops.insert(op_key.to_string(), now_ms());
        true
    }

    fn unexpected(&self, from: Rank, phase: &str, reply: ClusterReply) -> ClusterError {
        match reply {
            ClusterReply::Error(msg) => ClusterError::ProtocolViolation(format!(
                "rank {} failed the {} step: {}",
                from, phase, msg
            )),
            other => ClusterError::ProtocolViolation(format!(
                "rank {} answered the {} step with {:?}",
                from, phase, other
            )),
        }
    }

    fn expect_acks(&self, replies: Vec<(Rank, ClusterReply)>, phase: &str) -> Result<()> {
        for (rank, reply) in replies {
            if !matches!(reply, ClusterReply::Ack) {
                return Err(self.unexpected(rank, phase, reply));
            }
        }
        Ok(())
    }

    async fn send_expect_ack(&self, to: Rank, request: ClusterRequest, phase: &str) -> Result<()> {
        match self.transport.send(to, request).await? {
            ClusterReply::Ack => Ok(()),
            other => Err(self.unexpected(to, phase, other)),
        }
    }

    /// Rebuilds the ownership directory if it was invalidated: every rank
    /// reports the ids it currently holds, and the merged map replaces the
    /// old one. Paid once per invalidation, not once per lookup.
    async fn ensure_directory(&self) -> Result<()> {
        if self.directory.is_built() {
            return Ok(());
        }
        tracing::debug!("rank {}: rebuilding ownership directory", self.rank());

        let local_ids = self.store.read().await.ids();
        let mut reports = vec![(self.rank(), local_ids)];
        for (rank, reply) in self.transport.broadcast(ClusterRequest::WhoHas).await? {
            match reply {
                ClusterReply::Owned(ids) => reports.push((rank, ids)),
                other => return Err(self.unexpected(rank, "who-has", other)),
            }
        }
        self.directory.install(reports);
        Ok(())
    }

    // --- Public read/write API ---

    /// Resolves the rank owning `id`.
    pub async fn owner_of(&self, id: ParticleId) -> Result<Rank> {
        if !id.is_valid() {
            return Err(ClusterError::InvalidId(id.0));
        }
        self.ensure_directory().await?;
        self.directory.validate(id)?;
        self.directory
            .lookup(id)
            .ok_or(ClusterError::UnknownId(id))
    }

    pub async fn exists(&self, id: ParticleId) -> Result<bool> {
        if !id.is_valid() {
            return Ok(false);
        }
        self.ensure_directory().await?;
        Ok(self.directory.contains(id))
    }

    /// Every particle id in the system, sorted.
    pub async fn all_ids(&self) -> Result<Vec<ParticleId>> {
        self.ensure_directory().await?;
        Ok(self.directory.ids_sorted())
    }

    /// Highest id currently assigned, or -1 for an empty system.
    pub async fn max_particle_id(&self) -> Result<i64> {
        self.ensure_directory().await?;
        Ok(self.directory.max_seen())
    }

    /// Places a new particle. The decomposition picks the owning rank from
    /// the record's position; every rank learns the new entry through the
    /// place token.
    pub async fn insert(&self, record: ParticleRecord) -> Result<()> {
        let id = record.id;
        if !id.is_valid() {
            return Err(ClusterError::InvalidId(id.0));
        }
        self.ensure_directory().await?;
        if self.directory.contains(id) {
            return Err(ClusterError::AlreadyExists(id));
        }

        let owner = self.decomposition.rank_of(&record.position);
        let op_id = Uuid::new_v4().to_string();
        tracing::debug!("placing particle {} on rank {}", id, owner);

        let replies = self
            .transport
            .broadcast(ClusterRequest::EnterPlace {
                op_id: op_id.clone(),
                id,
                owner,
            })
            .await?;
        self.expect_acks(replies, "enter-place")?;
        self.directory.note_insert(id, owner);

        if owner == self.rank() {
            let cell = self.decomposition.cell_of(&record.position);
            self.store.write().await.insert(cell, record)?;
        } else {
            self.send_expect_ack(owner, ClusterRequest::DepositRecord { op_id, record }, "deposit")
                .await?;
        }

        self.particle_changed();
        Ok(())
    }

    /// Removes a particle everywhere: the owner extracts the record, every
    /// rank drops the directory entry and strips bonds referencing the id.
    pub async fn remove(&self, id: ParticleId) -> Result<()> {
        let owner = self.owner_of(id).await?;
        let op_id = Uuid::new_v4().to_string();
        tracing::debug!("removing particle {} owned by rank {}", id, owner);

        let replies = self
            .transport
            .broadcast(ClusterRequest::EnterRemove { op_id, id, owner })
            .await?;
        self.expect_acks(replies, "enter-remove")?;

        {
            let mut store = self.store.write().await;
            if owner == self.rank() {
                store.remove(id)?;
            }
            store.strip_bonds_to(id);
        }
        self.directory.note_remove(id);
        self.particle_changed();
        Ok(())
    }

    /// Clears the whole particle system on every rank.
    pub async fn remove_all(&self) -> Result<()> {
        let op_id = Uuid::new_v4().to_string();
        let replies = self
            .transport
            .broadcast(ClusterRequest::EnterRemoveAll { op_id })
            .await?;
        self.expect_acks(replies, "enter-remove-all")?;

        self.store.write().await.clear();
        self.directory.reset();
        self.cache.invalidate_all();
        self.particle_changed();
        Ok(())
    }

    /// Rebins a particle to `position`. Same owner: a cell-to-cell move.
    /// Different owner: the record is extracted and deposited on the new
    /// rank, identity and state intact. Either way ownership may have
    /// changed, so every rank drops its directory wholesale.
    pub async fn relocate(&self, id: ParticleId, position: [f64; 3]) -> Result<()> {
        let old = self.owner_of(id).await?;
        let dst = self.decomposition.rank_of(&position);
        let op_id = Uuid::new_v4().to_string();
        tracing::debug!(
            "rebinning particle {} from rank {} to rank {}",
            id,
            old,
            dst
        );

        let replies = self
            .transport
            .broadcast(ClusterRequest::EnterRebin {
                op_id: op_id.clone(),
                id,
                from: old,
                to: dst,
            })
            .await?;
        self.expect_acks(replies, "enter-rebin")?;

        let me = self.rank();
        if old == me {
            if dst == me {
                let mut store = self.store.write().await;
                let cell = self.decomposition.cell_of(&position);
                store.relocate(id, cell)?;
                if let Some(record) = store.get_mut(id) {
                    record.position = position;
                }
            } else {
                let mut record = self.store.write().await.remove(id)?;
                record.position = position;
                self.send_expect_ack(dst, ClusterRequest::DepositRecord { op_id, record }, "deposit")
                    .await?;
            }
        } else if dst == old {
            self.send_expect_ack(
                old,
                ClusterRequest::RebinLocal {
                    op_id,
                    id,
                    position,
                },
                "rebin-local",
            )
            .await?;
        } else {
            let record = match self
                .transport
                .send(
                    old,
                    ClusterRequest::ExtractRecord {
                        op_id: op_id.clone(),
                        id,
                        position,
                    },
                )
                .await?
            {
                ClusterReply::Record(record) => record,
                other => return Err(self.unexpected(old, "extract", other)),
            };
            if dst == me {
                let cell = self.decomposition.cell_of(&position);
                self.store.write().await.insert(cell, record)?;
            } else {
                self.send_expect_ack(dst, ClusterRequest::DepositRecord { op_id, record }, "deposit")
                    .await?;
            }
        }

        self.directory.invalidate();
        self.particle_changed();
        Ok(())
    }

    /// Reads one particle. Locally owned records come straight from the
    /// authoritative store; remote records are served from the snapshot cache
    /// or fetched from the owner on a miss.
    pub async fn read(&self, id: ParticleId) -> Result<ParticleRecord> {
        let owner = self.owner_of(id).await?;

        if owner == self.rank() {
            return self.store.read().await.get(id).cloned().ok_or_else(|| {
                ClusterError::ProtocolViolation(format!(
                    "directory lists particle {} on rank {} but the store has no record",
                    id,
                    self.rank()
                ))
            });
        }

        if let Some(snapshot) = self.cache.get(id) {
            return Ok(snapshot);
        }

        match self
            .transport
            .send(owner, ClusterRequest::FetchOne { id })
            .await?
        {
            ClusterReply::Record(record) => {
                self.cache.put(id, record.clone());
                Ok(record)
            }
            ClusterReply::NotFound(_) => Err(ClusterError::UnknownId(id)),
            other => Err(self.unexpected(owner, "fetch", other)),
        }
    }

    /// Reads many particles in one round: ids are grouped by owner and each
    /// involved rank answers its whole sublist at once. Records come back in
    /// arbitrary order; duplicate input ids are collapsed up front.
    pub async fn read_many(&self, ids: &[ParticleId]) -> Result<Vec<ParticleRecord>> {
        let mut seen = HashSet::new();
        let mut groups: HashMap<Rank, Vec<ParticleId>> = HashMap::new();
        for &id in ids {
            if !seen.insert(id) {
                continue;
            }
            let owner = self.owner_of(id).await?;
            groups.entry(owner).or_default().push(id);
        }

        let mut records = Vec::with_capacity(seen.len());
        if let Some(local) = groups.remove(&self.rank()) {
            let store = self.store.read().await;
            for id in local {
                let record = store.get(id).cloned().ok_or_else(|| {
                    ClusterError::ProtocolViolation(format!(
                        "directory lists particle {} on rank {} but the store has no record",
                        id,
                        self.rank()
                    ))
                })?;
                records.push(record);
            }
        }
        for (owner, ids) in groups {
            match self
                .transport
                .send(owner, ClusterRequest::FetchMany { ids })
                .await?
            {
                ClusterReply::Records(mut batch) => records.append(&mut batch),
                other => return Err(self.unexpected(owner, "fetch-many", other)),
            }
        }
        Ok(records)
    }

    /// Warms the snapshot cache for the given ids. Ids that are local,
    /// already cached or nonexistent are stripped, and the rest is truncated
    /// to the cache capacity. Fire-and-forget: failures are logged, not
    /// returned.
    pub async fn prefetch(&self, ids: &[ParticleId]) {
        if self.world_size() == 1 {
            return;
        }
        if let Err(e) = self.try_prefetch(ids).await {
            tracing::warn!("rank {}: prefetch failed: {}", self.rank(), e);
        }
    }

    async fn try_prefetch(&self, ids: &[ParticleId]) -> Result<()> {
        self.ensure_directory().await?;

        let me = self.rank();
        let mut seen = HashSet::new();
        let mut wanted: Vec<(ParticleId, Rank)> = Vec::new();
        for &id in ids {
            if !id.is_valid() || !seen.insert(id) {
                continue;
            }
            match self.directory.lookup(id) {
                None => continue,
                Some(owner) if owner == me => continue,
                Some(_) if self.cache.has(id) => continue,
                Some(owner) => wanted.push((id, owner)),
            }
        }
        wanted.truncate(self.cache.max_entries());
        if wanted.is_empty() {
            return Ok(());
        }

        let mut groups: HashMap<Rank, Vec<ParticleId>> = HashMap::new();
        for (id, owner) in wanted {
            groups.entry(owner).or_default().push(id);
        }
        for (owner, ids) in groups {
            match self
                .transport
                .send(owner, ClusterRequest::FetchMany { ids })
                .await?
            {
                ClusterReply::Records(batch) => {
                    for record in batch {
                        self.cache.put(record.id, record);
                    }
                }
                other => return Err(self.unexpected(owner, "fetch-many", other)),
            }
        }
        Ok(())
    }

    /// Applies one tagged mutation to the particle, wherever it lives.
    ///
    /// Phase one broadcasts the enter-mutation token so every rank walks the
    /// same handler path; phase two applies the payload locally or ships it
    /// point-to-point to the owner. The call returns only after the owner has
    /// applied the message, and every rank has run the particle-changed hook
    /// exactly once by then.
    pub async fn mutate(&self, id: ParticleId, message: UpdateMessage) -> Result<()> {
        let owner = self.owner_of(id).await?;
        let op_id = Uuid::new_v4().to_string();
        tracing::debug!(
            "mutating particle {} ({}) owned by rank {}",
            id,
            message.kind(),
            owner
        );

        let replies = self
            .transport
            .broadcast(ClusterRequest::EnterMutation {
                op_id: op_id.clone(),
                id,
                owner,
            })
            .await?;
        self.expect_acks(replies, "enter-mutation")?;

        if owner == self.rank() {
            let mut store = self.store.write().await;
            let record = store.get_mut(id).ok_or_else(|| {
                ClusterError::ProtocolViolation(format!(
                    "directory lists particle {} on rank {} but the store has no record",
                    id,
                    self.rank()
                ))
            })?;
            message.apply(record);
        } else {
            self.send_expect_ack(
                owner,
                ClusterRequest::ApplyMutation {
                    op_id,
                    id,
                    message,
                },
                "apply-mutation",
            )
            .await?;
        }

        self.particle_changed();
        Ok(())
    }

    // --- Typed setters over the mutation protocol ---

    pub async fn set_position(&self, id: ParticleId, position: [f64; 3]) -> Result<()> {
        self.mutate(id, UpdateMessage::Position(PositionUpdate::Position(position)))
            .await
    }

    pub async fn set_orientation(&self, id: ParticleId, quat: [f64; 4]) -> Result<()> {
        self.mutate(id, UpdateMessage::Position(PositionUpdate::Orientation(quat)))
            .await
    }

    pub async fn set_velocity(&self, id: ParticleId, velocity: [f64; 3]) -> Result<()> {
        self.mutate(id, UpdateMessage::Momentum(MomentumUpdate::Velocity(velocity)))
            .await
    }

    pub async fn set_omega(&self, id: ParticleId, omega: [f64; 3]) -> Result<()> {
        self.mutate(id, UpdateMessage::Momentum(MomentumUpdate::Omega(omega)))
            .await
    }

    pub async fn set_force(&self, id: ParticleId, force: [f64; 3]) -> Result<()> {
        self.mutate(id, UpdateMessage::Force(ForceUpdate::Force(force)))
            .await
    }

    pub async fn set_torque(&self, id: ParticleId, torque: [f64; 3]) -> Result<()> {
        self.mutate(id, UpdateMessage::Force(ForceUpdate::Torque(torque)))
            .await
    }

    pub async fn set_mass(&self, id: ParticleId, mass: f64) -> Result<()> {
        self.mutate(id, UpdateMessage::Property(PropertyUpdate::Mass(mass)))
            .await
    }

    pub async fn set_charge(&self, id: ParticleId, charge: f64) -> Result<()> {
        self.mutate(id, UpdateMessage::Property(PropertyUpdate::Charge(charge)))
            .await
    }

    pub async fn set_type(&self, id: ParticleId, type_id: i32) -> Result<()> {
        self.mutate(id, UpdateMessage::Property(PropertyUpdate::Type(type_id)))
            .await
    }

    pub async fn set_mol_id(&self, id: ParticleId, mol_id: i32) -> Result<()> {
        self.mutate(id, UpdateMessage::Property(PropertyUpdate::MolId(mol_id)))
            .await
    }

    pub async fn add_bond(&self, id: ParticleId, bond: Bond) -> Result<()> {
        self.mutate(id, UpdateMessage::Bond(BondUpdate::Add(bond))).await
    }

    pub async fn remove_bond(&self, id: ParticleId, bond: Bond) -> Result<()> {
        self.mutate(id, UpdateMessage::Bond(BondUpdate::Remove(bond)))
            .await
    }

    pub async fn clear_bonds(&self, id: ParticleId) -> Result<()> {
        self.mutate(id, UpdateMessage::Bond(BondUpdate::Clear)).await
    }

    pub async fn rotate_particle(
        &self,
        id: ParticleId,
        axis: [f64; 3],
        angle: f64,
    ) -> Result<()> {
        self.mutate(id, UpdateMessage::RotateOrientation { axis, angle })
            .await
    }

    /// Adds a symmetric exclusion: both partners get the delta.
    pub async fn add_exclusion(&self, a: ParticleId, b: ParticleId) -> Result<()> {
        self.owner_of(a).await?;
        self.owner_of(b).await?;
        self.mutate(a, UpdateMessage::Exclusion(ExclusionUpdate::Add(b)))
            .await?;
        self.mutate(b, UpdateMessage::Exclusion(ExclusionUpdate::Add(a)))
            .await
    }

    /// Removes a symmetric exclusion from both partners.
    pub async fn remove_exclusion(&self, a: ParticleId, b: ParticleId) -> Result<()> {
        self.owner_of(a).await?;
        self.owner_of(b).await?;
        self.mutate(a, UpdateMessage::Exclusion(ExclusionUpdate::Remove(b)))
            .await?;
        self.mutate(b, UpdateMessage::Exclusion(ExclusionUpdate::Remove(a)))
            .await
    }

    // --- Handler side: requests arriving from other ranks ---

    /// Dispatches one request from a peer rank. Handlers act on rank-local
    /// state only; they never start a collective of their own.
    pub async fn handle(&self, request: ClusterRequest) -> ClusterReply {
        match request {
            ClusterRequest::EnterMutation { op_id, id, owner } => {
                if self.should_process(&format!("enter:{}", op_id)) {
                    tracing::trace!("rank {}: entering mutation of {}", self.rank(), id);
                    // The owner's hook fires when the payload is applied.
                    if owner != self.rank() {
                        self.particle_changed();
                    }
                }
                ClusterReply::Ack
            }

            ClusterRequest::ApplyMutation {
                op_id,
                id,
                message,
            } => {
                if !self.should_process(&format!("apply:{}", op_id)) {
                    return ClusterReply::Ack;
                }
                let mut store = self.store.write().await;
                match store.get_mut(id) {
                    Some(record) => {
                        message.apply(record);
                        drop(store);
                        self.particle_changed();
                        ClusterReply::Ack
                    }
                    None => {
                        tracing::error!(
                            "rank {}: mutation target {} is not resident here",
                            self.rank(),
                            id
                        );
                        ClusterReply::Error(format!(
                            "mutation target {} is not resident on rank {}",
                            id,
                            self.rank()
                        ))
                    }
                }
            }

            ClusterRequest::EnterPlace { op_id, id, owner } => {
                if self.should_process(&format!("enter:{}", op_id)) {
                    self.directory.note_insert(id, owner);
                    if owner != self.rank() {
                        self.particle_changed();
                    }
                }
                ClusterReply::Ack
            }

            ClusterRequest::DepositRecord { op_id, record } => {
                if !self.should_process(&format!("deposit:{}", op_id)) {
                    return ClusterReply::Ack;
                }
                let id = record.id;
                let cell = self.decomposition.cell_of(&record.position);
                match self.store.write().await.insert(cell, record) {
                    Ok(_) => {
                        self.directory.note_insert(id, self.rank());
                        self.particle_changed();
                        ClusterReply::Ack
                    }
                    Err(e) => {
                        tracing::error!(
                            "rank {}: deposit of particle {} failed: {}",
                            self.rank(),
                            id,
                            e
                        );
                        ClusterReply::Error(e.to_string())
                    }
                }
            }

            ClusterRequest::EnterRemove { op_id, id, owner } => {
                if !self.should_process(&format!("enter:{}", op_id)) {
                    return ClusterReply::Ack;
                }
                {
                    let mut store = self.store.write().await;
                    if owner == self.rank() {
                        if let Err(e) = store.remove(id) {
                            tracing::error!(
                                "rank {}: removal of particle {} failed: {}",
                                self.rank(),
                                id,
                                e
                            );
                            return ClusterReply::Error(e.to_string());
                        }
                    }
                    store.strip_bonds_to(id);
                }
                self.directory.note_remove(id);
                self.particle_changed();
                ClusterReply::Ack
            }

            ClusterRequest::EnterRemoveAll { op_id } => {
                if self.should_process(&format!("enter:{}", op_id)) {
                    self.store.write().await.clear();
                    self.directory.reset();
                    self.cache.invalidate_all();
                    self.particle_changed();
                }
                ClusterReply::Ack
            }

            ClusterRequest::EnterRebin {
                op_id,
                id,
                from,
                to,
            } => {
                if self.should_process(&format!("enter:{}", op_id)) {
                    tracing::trace!("rank {}: particle {} is rebinning", self.rank(), id);
                    self.directory.invalidate();
                    // Acting ranks run the hook when the record moves.
                    if from != self.rank() && to != self.rank() {
                        self.particle_changed();
                    }
                }
                ClusterReply::Ack
            }

            ClusterRequest::RebinLocal {
                op_id,
                id,
                position,
            } => {
                if !self.should_process(&format!("rebin:{}", op_id)) {
                    return ClusterReply::Ack;
                }
                let cell = self.decomposition.cell_of(&position);
                let mut store = self.store.write().await;
                match store.relocate(id, cell) {
                    Ok(_) => {
                        if let Some(record) = store.get_mut(id) {
                            record.position = position;
                        }
                        drop(store);
                        self.particle_changed();
                        ClusterReply::Ack
                    }
                    Err(e) => {
                        tracing::error!(
                            "rank {}: local rebin of particle {} failed: {}",
                            self.rank(),
                            id,
                            e
                        );
                        ClusterReply::Error(e.to_string())
                    }
                }
            }

            ClusterRequest::ExtractRecord {
                op_id,
                id,
                position,
            } => {
                if !self.should_process(&format!("extract:{}", op_id)) {
                    // The record already left with the first delivery.
                    return ClusterReply::Error(format!(
                        "duplicate extract of particle {}",
                        id
                    ));
                }
                match self.store.write().await.remove(id) {
                    Ok(mut record) => {
                        record.position = position;
                        self.particle_changed();
                        ClusterReply::Record(record)
                    }
                    Err(e) => {
                        tracing::error!(
                            "rank {}: extract of particle {} failed: {}",
                            self.rank(),
                            id,
                            e
                        );
                        ClusterReply::Error(e.to_string())
                    }
                }
            }

            ClusterRequest::FetchOne { id } => match self.store.read().await.get(id) {
                Some(record) => ClusterReply::Record(record.clone()),
                None => ClusterReply::NotFound(id),
            },

            ClusterRequest::FetchMany { ids } => {
                let store = self.store.read().await;
                let mut records = Vec::with_capacity(ids.len());
                for id in ids {
                    match store.get(id) {
                        Some(record) => records.push(record.clone()),
                        None => tracing::warn!(
                            "rank {}: fetch-many asked for {} which is not resident here",
                            self.rank(),
                            id
                        ),
                    }
                }
                ClusterReply::Records(records)
            }

            ClusterRequest::WhoHas => ClusterReply::Owned(self.store.read().await.ids()),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
