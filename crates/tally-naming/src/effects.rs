//! Discovery effect trait
//!
//! The interface replicas use to advertise themselves and locate peers.
//! The in-process [`NamingRegistry`](crate::NamingRegistry) implements it;
//! a networked registry client would implement the same trait.

use crate::error::NamingResult;
use crate::registry::ServerId;
use async_trait::async_trait;
use std::sync::Arc;
use tally_core::ReplicaRole;

#[async_trait]
pub trait DiscoveryEffects: Send + Sync {
    /// Advertise `address` under `service`; returns the assigned server id.
    async fn register(
        &self,
        service: &str,
        address: &str,
        role: ReplicaRole,
    ) -> NamingResult<ServerId>;

    /// Addresses registered for `service`, optionally filtered by role.
    async fn lookup(&self, service: &str, role: Option<ReplicaRole>) -> NamingResult<Vec<String>>;

    /// Withdraw `address` from `service`.
    async fn unregister(&self, service: &str, address: &str) -> NamingResult<()>;
}

#[async_trait]
impl<T: DiscoveryEffects + ?Sized> DiscoveryEffects for Arc<T> {
    async fn register(
        &self,
        service: &str,
        address: &str,
        role: ReplicaRole,
    ) -> NamingResult<ServerId> {
        (**self).register(service, address, role).await
    }

    async fn lookup(&self, service: &str, role: Option<ReplicaRole>) -> NamingResult<Vec<String>> {
        (**self).lookup(service, role).await
    }

    async fn unregister(&self, service: &str, address: &str) -> NamingResult<()> {
        (**self).unregister(service, address).await
    }
}
