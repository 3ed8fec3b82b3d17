//! Discovery trait tests through a shared, type-erased registry.

use std::sync::Arc;
use tally_core::ReplicaRole;
use tally_naming::{DiscoveryEffects, NamingError, NamingRegistry};

const SERVICE: &str = "DistLedger";

#[tokio::test]
async fn register_lookup_unregister_through_trait_object() {
    let discovery: Arc<dyn DiscoveryEffects> = Arc::new(NamingRegistry::default());

    let primary = discovery
        .register(SERVICE, "localhost:2001", ReplicaRole::Primary)
        .await
        .unwrap();
    let secondary = discovery
        .register(SERVICE, "localhost:2002", ReplicaRole::Secondary)
        .await
        .unwrap();
    assert_eq!((primary, secondary), (0, 1));

    let primaries = discovery
        .lookup(SERVICE, Some(ReplicaRole::Primary))
        .await
        .unwrap();
    assert_eq!(primaries, vec!["localhost:2001".to_string()]);

    discovery.unregister(SERVICE, "localhost:2001").await.unwrap();
    let remaining = discovery.lookup(SERVICE, None).await.unwrap();
    assert_eq!(remaining, vec!["localhost:2002".to_string()]);
}

#[tokio::test]
async fn errors_surface_through_trait() {
    let registry = Arc::new(NamingRegistry::default());
    registry
        .register(SERVICE, "localhost:2001", ReplicaRole::Primary)
        .await
        .unwrap();

    let duplicate = registry
        .register(SERVICE, "localhost:2001", ReplicaRole::Primary)
        .await;
    assert!(matches!(duplicate, Err(NamingError::RegistryFailed { .. })));

    let missing = registry.unregister(SERVICE, "localhost:9999").await;
    assert!(matches!(missing, Err(NamingError::RemovalFailed { .. })));
}
