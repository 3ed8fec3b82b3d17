//! Replica node service
//!
//! [`ReplicaNode`] guards one [`ReplicaState`] behind a single mutex. Each
//! client, admin and replication entry point holds that lock for its whole
//! duration, so clock updates, log appends and account changes are seen
//! atomically. Successful writes capture a [`GossipSnapshot`] under the
//! lock and push it to peers only after the lock is dropped, so an
//! unreachable peer never stalls local traffic.

use crate::config::ReplicaConfig;
use crate::error::{NodeError, NodeResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tally_core::{
    BalanceReading, LedgerResult, Operation, PropagationReport, ReplicaRole, ReplicaState,
    VectorClock,
};
use tally_gossip::{
    FrameHandler, GossipPropagator, GossipResult, GossipSnapshot, MemoryNetwork, PeerTransport,
    PropagateRequest, PushSummary,
};
use tally_naming::DiscoveryEffects;

/// A running ledger replica.
pub struct ReplicaNode {
    config: ReplicaConfig,
    state: Mutex<ReplicaState>,
    discovery: Arc<dyn DiscoveryEffects>,
    propagator: GossipPropagator,
}

impl std::fmt::Debug for ReplicaNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicaNode")
            .field("address", &self.config.address)
            .field("role", &self.config.role)
            .field("service", &self.config.service)
            .finish_non_exhaustive()
    }
}

impl ReplicaNode {
    /// Register with discovery and build the node around `transport`.
    ///
    /// A primary refuses to start while another primary is registered for
    /// the same service. The server id discovery assigns becomes the
    /// replica's vector clock index.
    pub async fn start(
        config: ReplicaConfig,
        discovery: Arc<dyn DiscoveryEffects>,
        transport: Arc<dyn PeerTransport>,
    ) -> NodeResult<Arc<Self>> {
        config.validate()?;

        // Discovery enforces the single-primary rule under its own lock
        let index = discovery
            .register(&config.service, &config.address, config.role)
            .await
            .map_err(NodeError::registration)?;
        if index >= config.num_replicas {
            if let Err(e) = discovery.unregister(&config.service, &config.address).await {
                tracing::warn!(address = %config.address, error = %e, "Failed to roll back registration");
            }
            return Err(NodeError::ReplicaIndexOutOfRange {
                index,
                num_replicas: config.num_replicas,
            });
        }

        tracing::info!(
            service = %config.service,
            address = %config.address,
            role = %config.role,
            replica = index,
            "Replica started"
        );

        let propagator = GossipPropagator::new(
            config.service.clone(),
            config.address.clone(),
            Arc::clone(&discovery),
            transport,
        );
        Ok(Arc::new(Self {
            state: Mutex::new(ReplicaState::new(index, config.num_replicas, config.role)),
            config,
            discovery,
            propagator,
        }))
    }

    /// [`start`](Self::start) on an in-memory network, binding the node as
    /// the endpoint for its address.
    pub async fn join(
        config: ReplicaConfig,
        discovery: Arc<dyn DiscoveryEffects>,
        network: &Arc<MemoryNetwork>,
    ) -> NodeResult<Arc<Self>> {
        let transport: Arc<dyn PeerTransport> = Arc::new(network.endpoint(&config.address));
        let node = Self::start(config, discovery, transport).await?;
        network.bind(&node.config.address, &node);
        Ok(node)
    }

    /// Withdraw from discovery. Peers stop pushing to this node.
    pub async fn leave(&self) -> NodeResult<()> {
        self.discovery
            .unregister(&self.config.service, &self.config.address)
            .await?;
        tracing::info!(address = %self.config.address, "Replica left service");
        Ok(())
    }

    // === Client operations ===

    pub async fn create_account(
        &self,
        account: &str,
        prev_ts: &VectorClock,
    ) -> LedgerResult<VectorClock> {
        self.write(|state| state.create_account(account, prev_ts))
            .await
    }

    pub async fn delete_account(
        &self,
        account: &str,
        prev_ts: &VectorClock,
    ) -> LedgerResult<VectorClock> {
        self.write(|state| state.delete_account(account, prev_ts))
            .await
    }

    pub async fn transfer(
        &self,
        from: &str,
        to: &str,
        amount: i64,
        prev_ts: &VectorClock,
    ) -> LedgerResult<VectorClock> {
        self.write(|state| state.transfer(from, to, amount, prev_ts))
            .await
    }

    pub fn balance(&self, account: &str, prev_ts: &VectorClock) -> LedgerResult<BalanceReading> {
        self.state.lock().balance(account, prev_ts)
    }

    // === Admin operations ===

    pub fn activate(&self) {
        self.state.lock().activate();
    }

    pub fn deactivate(&self) {
        self.state.lock().deactivate();
    }

    pub fn ledger(&self) -> Vec<Operation> {
        self.state.lock().ledger()
    }

    // === Replication ===

    /// Fold a peer push into local state.
    pub fn propagate(&self, ops: Vec<Operation>, peer_issued_ts: &VectorClock) -> PropagationReport {
        self.state.lock().propagate(ops, peer_issued_ts)
    }

    /// Push the current log to every peer without a triggering write.
    pub async fn gossip(&self) -> PushSummary {
        let snapshot = Self::snapshot(&self.state.lock());
        self.propagator.push(snapshot).await
    }

    // === Introspection ===

    pub fn config(&self) -> &ReplicaConfig {
        &self.config
    }

    pub fn address(&self) -> &str {
        &self.config.address
    }

    pub fn role(&self) -> ReplicaRole {
        self.config.role
    }

    pub fn replica_index(&self) -> usize {
        self.state.lock().replica_index()
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().is_active()
    }

    pub fn issued_ts(&self) -> VectorClock {
        self.state.lock().issued_ts().clone()
    }

    pub fn applied_ts(&self) -> VectorClock {
        self.state.lock().applied_ts().clone()
    }

    pub fn accounts(&self) -> BTreeMap<String, i64> {
        self.state.lock().accounts()
    }

    pub fn ledger_len(&self) -> usize {
        self.state.lock().ledger_len()
    }

    // Run a mutating call under the lock, then push outside it.
    async fn write<F>(&self, call: F) -> LedgerResult<VectorClock>
    where
        F: FnOnce(&mut ReplicaState) -> LedgerResult<VectorClock>,
    {
        let (ts, snapshot) = {
            let mut state = self.state.lock();
            let ts = call(&mut state)?;
            let snapshot = self
                .config
                .gossip
                .push_on_write
                .then(|| Self::snapshot(&state));
            (ts, snapshot)
        };
        if let Some(snapshot) = snapshot {
            self.propagator.push(snapshot).await;
        }
        Ok(ts)
    }

    fn snapshot(state: &ReplicaState) -> GossipSnapshot {
        GossipSnapshot {
            ops: state.ledger(),
            issued_ts: state.issued_ts().clone(),
        }
    }
}

#[async_trait]
impl FrameHandler for ReplicaNode {
    async fn handle_frame(&self, frame: Vec<u8>) -> GossipResult<()> {
        let request = PropagateRequest::decode(&frame).map_err(|e| {
            tracing::warn!(address = %self.config.address, error = %e, "Rejecting push");
            e
        })?;
        let report = self.propagate(request.ops, &request.issued_ts);
        tracing::debug!(
            address = %self.config.address,
            sender = %request.sender,
            appended = report.appended,
            duplicates = report.duplicates,
            replayed = report.replayed(),
            "Applied push"
        );
        Ok(())
    }
}
