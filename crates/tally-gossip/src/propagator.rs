//! Discovery-driven full-state push
//!
//! The propagator never touches replica state: callers capture a
//! [`GossipSnapshot`] under their own lock, release it, then hand the
//! snapshot over. Each peer is contacted independently; a failed or
//! unreachable peer is logged and skipped.

use crate::error::{GossipError, GossipResult};
use crate::transport::PeerTransport;
use crate::wire::PropagateRequest;
use futures::future::join_all;
use std::sync::Arc;
use tally_core::{Operation, VectorClock};
use tally_naming::DiscoveryEffects;

/// Log and clock captured from a replica for one push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GossipSnapshot {
    pub ops: Vec<Operation>,
    pub issued_ts: VectorClock,
}

/// What happened to one push. Never surfaced to clients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushSummary {
    /// Peers discovery returned, excluding the sender
    pub peers: Vec<String>,
    pub delivered: usize,
    /// Per-target failures; a discovery failure is keyed by service name
    pub failures: Vec<(String, GossipError)>,
}

impl PushSummary {
    pub fn all_delivered(&self) -> bool {
        self.failures.is_empty() && self.delivered == self.peers.len()
    }
}

/// Pushes snapshots to every other replica of a service.
#[derive(Clone)]
pub struct GossipPropagator {
    service: String,
    self_address: String,
    discovery: Arc<dyn DiscoveryEffects>,
    transport: Arc<dyn PeerTransport>,
}

impl GossipPropagator {
    pub fn new(
        service: impl Into<String>,
        self_address: impl Into<String>,
        discovery: Arc<dyn DiscoveryEffects>,
        transport: Arc<dyn PeerTransport>,
    ) -> Self {
        Self {
            service: service.into(),
            self_address: self_address.into(),
            discovery,
            transport,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn self_address(&self) -> &str {
        &self.self_address
    }

    /// Every registered replica of the service except this one.
    pub async fn peers(&self) -> GossipResult<Vec<String>> {
        let addresses = self.discovery.lookup(&self.service, None).await?;
        Ok(addresses
            .into_iter()
            .filter(|address| *address != self.self_address)
            .collect())
    }

    /// Push `snapshot` to all peers concurrently.
    pub async fn push(&self, snapshot: GossipSnapshot) -> PushSummary {
        let mut summary = PushSummary::default();

        let peers = match self.peers().await {
            Ok(peers) => peers,
            Err(e) => {
                tracing::warn!(service = %self.service, error = %e, "Peer lookup failed, skipping push");
                summary.failures.push((self.service.clone(), e));
                return summary;
            }
        };
        if peers.is_empty() {
            tracing::debug!(service = %self.service, "No peers to propagate to");
            return summary;
        }

        let op_count = snapshot.ops.len();
        let request = PropagateRequest::new(&self.self_address, snapshot.ops, snapshot.issued_ts);
        let frame = match request.encode() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode push");
                summary.peers = peers;
                summary.failures.push((self.service.clone(), e));
                return summary;
            }
        };

        let sends = peers.iter().map(|peer| {
            let frame = frame.clone();
            async move { (peer, self.transport.send(peer, frame).await) }
        });
        for (peer, result) in join_all(sends).await {
            match result {
                Ok(()) => {
                    tracing::debug!(peer = %peer, ops = op_count, "Propagated state");
                    summary.delivered += 1;
                }
                Err(e) => {
                    tracing::warn!(peer = %peer, error = %e, "Propagation to peer failed");
                    summary.failures.push((peer.clone(), e));
                }
            }
        }

        if !summary.failures.is_empty() {
            tracing::warn!(
                failed_count = summary.failures.len(),
                total_peers = peers.len(),
                "Some peers did not receive the push"
            );
        }
        summary.peers = peers;
        summary
    }
}
