//! In-process naming registry
//!
//! Tracks, per service name, the replicas that advertised themselves and
//! the role each one runs with. Registration order is preserved so lookups
//! are deterministic. Ids are handed out in increasing order per service
//! and never reused, and a service holds at most one primary.

use crate::config::RegistryConfig;
use crate::effects::DiscoveryEffects;
use crate::error::{NamingError, NamingResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tally_core::ReplicaRole;

/// Identifier handed out on registration; doubles as the replica's
/// vector-clock index.
pub type ServerId = usize;

/// One registered replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEntry {
    pub id: ServerId,
    pub address: String,
    pub role: ReplicaRole,
}

#[derive(Debug, Default)]
struct ServiceEntry {
    servers: Vec<ServerEntry>,
    /// Next id to hand out; survives unregistration
    next_id: ServerId,
}

impl ServiceEntry {
    fn find(&self, address: &str) -> Option<usize> {
        self.servers
            .iter()
            .position(|server| server.address == address)
    }

    fn primary(&self) -> Option<&ServerEntry> {
        self.servers
            .iter()
            .find(|server| server.role == ReplicaRole::Primary)
    }

    fn allocate_id(&mut self) -> ServerId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Registry of services and their replicas.
#[derive(Debug, Default)]
pub struct NamingRegistry {
    config: RegistryConfig,
    services: Mutex<BTreeMap<String, ServiceEntry>>,
}

impl NamingRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            services: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register `address` under `service`, returning its id.
    ///
    /// Checked in order under one lock: duplicate address, existing primary
    /// (for a primary), then the per-service bound.
    pub fn register_server(
        &self,
        service: &str,
        address: &str,
        role: ReplicaRole,
    ) -> NamingResult<ServerId> {
        let mut services = self.services.lock();
        let entry = services.entry(service.to_string()).or_default();

        if entry.find(address).is_some() {
            tracing::warn!(service, address, "Duplicate registration refused");
            return Err(NamingError::registry_failed(service, address));
        }
        if role == ReplicaRole::Primary {
            if let Some(primary) = entry.primary() {
                tracing::warn!(service, address, existing = %primary.address, "Second primary refused");
                return Err(NamingError::PrimaryAlreadyRegistered {
                    service: service.to_string(),
                    address: primary.address.clone(),
                });
            }
        }
        if entry.servers.len() >= self.config.max_servers_per_service {
            return Err(NamingError::ServiceFull {
                service: service.to_string(),
                max: self.config.max_servers_per_service,
            });
        }

        let id = entry.allocate_id();
        entry.servers.push(ServerEntry {
            id,
            address: address.to_string(),
            role,
        });
        tracing::info!(service, address, %role, id, "Server registered");
        Ok(id)
    }

    pub fn lookup_servers(&self, service: &str, role: Option<ReplicaRole>) -> Vec<String> {
        let services = self.services.lock();
        services
            .get(service)
            .map(|entry| {
                entry
                    .servers
                    .iter()
                    .filter(|server| role.map_or(true, |wanted| server.role == wanted))
                    .map(|server| server.address.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn unregister_server(&self, service: &str, address: &str) -> NamingResult<()> {
        let mut services = self.services.lock();
        let entry = services
            .get_mut(service)
            .ok_or_else(|| NamingError::removal_failed(service, address))?;
        let position = entry
            .find(address)
            .ok_or_else(|| NamingError::removal_failed(service, address))?;
        entry.servers.remove(position);
        tracing::info!(service, address, "Server unregistered");
        Ok(())
    }
}

#[async_trait]
impl DiscoveryEffects for NamingRegistry {
    async fn register(
        &self,
        service: &str,
        address: &str,
        role: ReplicaRole,
    ) -> NamingResult<ServerId> {
        self.register_server(service, address, role)
    }

    async fn lookup(&self, service: &str, role: Option<ReplicaRole>) -> NamingResult<Vec<String>> {
        Ok(self.lookup_servers(service, role))
    }

    async fn unregister(&self, service: &str, address: &str) -> NamingResult<()> {
        self.unregister_server(service, address)
    }
}
