//! Propagator fan-out over the in-memory network.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tally_core::{Operation, OperationKind, ReplicaRole, VectorClock};
use tally_gossip::{
    FrameHandler, GossipError, GossipPropagator, GossipResult, GossipSnapshot, MemoryNetwork,
    PeerTransport, PropagateRequest,
};
use tally_naming::{DiscoveryEffects, NamingRegistry};

const SERVICE: &str = "DistLedger";

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Default)]
struct Inbox {
    received: Mutex<Vec<PropagateRequest>>,
}

#[async_trait]
impl FrameHandler for Inbox {
    async fn handle_frame(&self, frame: Vec<u8>) -> GossipResult<()> {
        let request = PropagateRequest::decode(&frame)?;
        self.received.lock().push(request);
        Ok(())
    }
}

fn snapshot() -> GossipSnapshot {
    let create = Operation::new(
        0,
        OperationKind::Create {
            account: "alice".to_string(),
        },
        VectorClock::new(3),
        VectorClock::from([1, 0, 0]),
    );
    GossipSnapshot {
        ops: vec![create],
        issued_ts: VectorClock::from([1, 0, 0]),
    }
}

async fn cluster(addresses: &[&str]) -> (Arc<NamingRegistry>, Arc<MemoryNetwork>, Vec<Arc<Inbox>>) {
    let registry = Arc::new(NamingRegistry::default());
    let network = Arc::new(MemoryNetwork::new());
    let mut inboxes = Vec::new();
    for (i, address) in addresses.iter().enumerate() {
        let role = if i == 0 {
            ReplicaRole::Primary
        } else {
            ReplicaRole::Secondary
        };
        registry.register(SERVICE, address, role).await.unwrap();
        let inbox = Arc::new(Inbox::default());
        network.bind(address, &inbox);
        inboxes.push(inbox);
    }
    (registry, network, inboxes)
}

fn propagator(
    registry: &Arc<NamingRegistry>,
    network: &Arc<MemoryNetwork>,
    address: &str,
) -> GossipPropagator {
    let discovery: Arc<dyn DiscoveryEffects> = registry.clone();
    let transport: Arc<dyn PeerTransport> = Arc::new(network.endpoint(address));
    GossipPropagator::new(SERVICE, address, discovery, transport)
}

// =============================================================================
// Fan-out
// =============================================================================

#[tokio::test]
async fn push_reaches_every_peer_but_self() {
    let (registry, network, inboxes) = cluster(&["h:1", "h:2", "h:3"]).await;
    let gossip = propagator(&registry, &network, "h:1");

    let summary = gossip.push(snapshot()).await;

    assert!(summary.all_delivered());
    assert_eq!(summary.peers, vec!["h:2".to_string(), "h:3".to_string()]);
    assert_eq!(summary.delivered, 2);
    assert!(inboxes[0].received.lock().is_empty());
    for inbox in &inboxes[1..] {
        let received = inbox.received.lock();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].sender, "h:1");
        assert_eq!(received[0].ops, snapshot().ops);
        assert_eq!(received[0].issued_ts, VectorClock::from([1, 0, 0]));
    }
}

#[tokio::test]
async fn lone_replica_pushes_nowhere() {
    let (registry, network, _inboxes) = cluster(&["h:1"]).await;
    let summary = propagator(&registry, &network, "h:1").push(snapshot()).await;

    assert!(summary.peers.is_empty());
    assert!(summary.all_delivered());
    assert_eq!(network.frames_delivered(), 0);
}

// =============================================================================
// Failure isolation
// =============================================================================

#[tokio::test]
async fn isolated_peer_does_not_block_the_rest() {
    let (registry, network, inboxes) = cluster(&["h:1", "h:2", "h:3"]).await;
    network.isolate("h:2");

    let summary = propagator(&registry, &network, "h:1").push(snapshot()).await;

    assert_eq!(summary.delivered, 1);
    assert_eq!(
        summary.failures,
        vec![("h:2".to_string(), GossipError::unreachable("h:2"))]
    );
    assert!(inboxes[1].received.lock().is_empty());
    assert_eq!(inboxes[2].received.lock().len(), 1);
}

#[tokio::test]
async fn registered_but_unbound_peer_is_skipped() {
    let (registry, network, inboxes) = cluster(&["h:1", "h:2"]).await;
    registry
        .register(SERVICE, "h:9", ReplicaRole::Secondary)
        .await
        .unwrap();

    let summary = propagator(&registry, &network, "h:1").push(snapshot()).await;

    assert_eq!(summary.peers.len(), 2);
    assert_eq!(summary.delivered, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(inboxes[1].received.lock().len(), 1);
}

#[tokio::test]
async fn receiver_rejection_is_reported_not_raised() {
    struct Refuser;

    #[async_trait]
    impl FrameHandler for Refuser {
        async fn handle_frame(&self, _frame: Vec<u8>) -> GossipResult<()> {
            Err(GossipError::malformed("refused"))
        }
    }

    let (registry, network, _inboxes) = cluster(&["h:1"]).await;
    registry
        .register(SERVICE, "h:2", ReplicaRole::Secondary)
        .await
        .unwrap();
    let refuser = Arc::new(Refuser);
    network.bind("h:2", &refuser);

    let summary = propagator(&registry, &network, "h:1").push(snapshot()).await;

    assert_eq!(summary.delivered, 0);
    assert!(matches!(
        summary.failures.as_slice(),
        [(peer, GossipError::MalformedPush { .. })] if peer == "h:2"
    ));
}
