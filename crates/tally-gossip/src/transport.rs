//! Point-to-point frame delivery between replicas
//!
//! [`PeerTransport`] is the sending half the propagator depends on and
//! [`FrameHandler`] the receiving half a replica exposes. [`MemoryNetwork`]
//! connects both in-process for tests and simulation, with switches to cut
//! individual replicas off the network.

use crate::error::{GossipError, GossipResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// Sending side of replica-to-replica delivery.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Deliver one frame to `peer` and wait for it to be processed.
    async fn send(&self, peer: &str, frame: Vec<u8>) -> GossipResult<()>;
}

/// Receiving side: a replica endpoint that accepts encoded pushes.
#[async_trait]
pub trait FrameHandler: Send + Sync {
    async fn handle_frame(&self, frame: Vec<u8>) -> GossipResult<()>;
}

/// In-memory network keyed by replica address.
///
/// Endpoints are held weakly, so a dropped replica simply becomes
/// unreachable.
#[derive(Default)]
pub struct MemoryNetwork {
    endpoints: RwLock<HashMap<String, Weak<dyn FrameHandler>>>,
    isolated: RwLock<HashSet<String>>,
    delivered: AtomicUsize,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `handler` under `address`, replacing any previous endpoint.
    pub fn bind<H: FrameHandler + 'static>(&self, address: &str, handler: &Arc<H>) {
        let weak: Weak<H> = Arc::downgrade(handler);
        let weak: Weak<dyn FrameHandler> = weak;
        self.endpoints.write().insert(address.to_string(), weak);
    }

    /// Detach `address`; later frames to it fail as unreachable.
    pub fn unbind(&self, address: &str) {
        tracing::debug!(address, "Unbinding endpoint");
        self.endpoints.write().remove(address);
    }

    /// Drop every frame sent to or from `address` until [`heal`](Self::heal).
    pub fn isolate(&self, address: &str) {
        tracing::debug!(address, "Isolating endpoint");
        self.isolated.write().insert(address.to_string());
    }

    pub fn heal(&self, address: &str) {
        tracing::debug!(address, "Healing endpoint");
        self.isolated.write().remove(address);
    }

    pub fn is_isolated(&self, address: &str) -> bool {
        self.isolated.read().contains(address)
    }

    /// Frames handed to a live endpoint so far.
    pub fn frames_delivered(&self) -> usize {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Deliver a frame on behalf of `from`.
    pub async fn deliver(&self, from: &str, to: &str, frame: Vec<u8>) -> GossipResult<()> {
        if self.is_isolated(from) || self.is_isolated(to) {
            return Err(GossipError::unreachable(to));
        }
        let handler = self
            .endpoints
            .read()
            .get(to)
            .and_then(Weak::upgrade)
            .ok_or_else(|| GossipError::unreachable(to))?;
        self.delivered.fetch_add(1, Ordering::Relaxed);
        handler.handle_frame(frame).await
    }

    /// Sending handle bound to one source address.
    pub fn endpoint(self: &Arc<Self>, address: &str) -> MemoryEndpoint {
        MemoryEndpoint {
            network: Arc::clone(self),
            address: address.to_string(),
        }
    }
}

/// A replica's view of the [`MemoryNetwork`] as a [`PeerTransport`].
#[derive(Clone)]
pub struct MemoryEndpoint {
    network: Arc<MemoryNetwork>,
    address: String,
}

impl MemoryEndpoint {
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl PeerTransport for MemoryEndpoint {
    async fn send(&self, peer: &str, frame: Vec<u8>) -> GossipResult<()> {
        self.network.deliver(&self.address, peer, frame).await
    }
}
