//! Replica node configuration
//!
//! Loaded from TOML. Every field except `address` has a default:
//!
//! ```toml
//! service = "DistLedger"
//! address = "localhost:2001"
//! role = "A"            # or "primary"; "B" / "secondary"
//! num_replicas = 3
//!
//! [gossip]
//! push_on_write = true
//! ```

use crate::error::{NodeError, NodeResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tally_core::ReplicaRole;
use tally_gossip::GossipConfig;

pub const DEFAULT_SERVICE: &str = "DistLedger";
pub const DEFAULT_NUM_REPLICAS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicaConfig {
    /// Service name replicas register and look each other up under
    pub service: String,
    /// Address this replica is reachable at
    pub address: String,
    pub role: ReplicaRole,
    /// Width of the vector clocks; bounds the replica index
    pub num_replicas: usize,
    pub gossip: GossipConfig,
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            service: DEFAULT_SERVICE.to_string(),
            address: String::new(),
            role: ReplicaRole::Primary,
            num_replicas: DEFAULT_NUM_REPLICAS,
            gossip: GossipConfig::default(),
        }
    }
}

impl ReplicaConfig {
    /// Config for `address` with every other field defaulted.
    pub fn new(address: impl Into<String>, role: ReplicaRole) -> Self {
        Self {
            address: address.into(),
            role,
            ..Self::default()
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    pub fn with_num_replicas(mut self, num_replicas: usize) -> Self {
        self.num_replicas = num_replicas;
        self
    }

    pub fn with_gossip(mut self, gossip: GossipConfig) -> Self {
        self.gossip = gossip;
        self
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> NodeResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| NodeError::config(format!("Invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> NodeResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            NodeError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> NodeResult<()> {
        if self.service.trim().is_empty() {
            return Err(NodeError::config("service must not be empty"));
        }
        if self.address.trim().is_empty() {
            return Err(NodeError::config("address must not be empty"));
        }
        if self.num_replicas == 0 {
            return Err(NodeError::config("num_replicas must be at least 1"));
        }
        Ok(())
    }
}
