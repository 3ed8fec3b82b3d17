//! TOML scenario files
//!
//! A scenario describes an in-memory cluster and a sequence of steps run
//! against it:
//!
//! ```toml
//! name = "partition-and-heal"
//! num_replicas = 3
//!
//! [[replicas]]
//! address = "localhost:2001"
//! role = "A"
//!
//! [[replicas]]
//! address = "localhost:2002"
//! role = "B"
//!
//! [[steps]]
//! action = "create"
//! replica = "localhost:2001"
//! account = "alice"
//!
//! [[steps]]
//! action = "balance"
//! replica = "localhost:2002"
//! account = "alice"
//! expect_balance = 0
//! ```
//!
//! Client steps run under a named session (`client`, default `"client"`)
//! whose clock is carried from one call to the next.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use tally_core::ReplicaRole;
use tally_gossip::GossipConfig;
use tally_replica::ReplicaConfig;

pub const DEFAULT_CLIENT: &str = "client";

fn default_service() -> String {
    tally_replica::config::DEFAULT_SERVICE.to_string()
}

fn default_client() -> String {
    DEFAULT_CLIENT.to_string()
}

/// Parsed scenario file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_service")]
    pub service: String,
    /// Vector clock width; defaults to the number of replicas
    #[serde(default)]
    pub num_replicas: Option<usize>,
    /// Replicas in registration order
    pub replicas: Vec<ReplicaSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One replica of the simulated cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicaSpec {
    pub address: String,
    #[serde(default)]
    pub role: ReplicaRole,
    #[serde(default)]
    pub gossip: GossipConfig,
}

/// A single scenario action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Create {
        replica: String,
        #[serde(default = "default_client")]
        client: String,
        account: String,
        /// Expected error code, e.g. `"account_already_exists"`
        expect_error: Option<String>,
    },
    Delete {
        replica: String,
        #[serde(default = "default_client")]
        client: String,
        account: String,
        expect_error: Option<String>,
    },
    Transfer {
        replica: String,
        #[serde(default = "default_client")]
        client: String,
        from: String,
        to: String,
        amount: i64,
        expect_error: Option<String>,
    },
    Balance {
        replica: String,
        #[serde(default = "default_client")]
        client: String,
        account: String,
        expect_balance: Option<i64>,
        expect_error: Option<String>,
    },
    Activate { replica: String },
    Deactivate { replica: String },
    /// Push the replica's full log without a write
    Gossip { replica: String },
    /// Cut the replica off the network
    Isolate { replica: String },
    Heal { replica: String },
    /// Print the replica's operation log
    Ledger { replica: String },
    Leave { replica: String },
}

impl Step {
    /// Address of the replica the step targets.
    pub fn replica(&self) -> &str {
        match self {
            Self::Create { replica, .. }
            | Self::Delete { replica, .. }
            | Self::Transfer { replica, .. }
            | Self::Balance { replica, .. }
            | Self::Activate { replica }
            | Self::Deactivate { replica }
            | Self::Gossip { replica }
            | Self::Isolate { replica }
            | Self::Heal { replica }
            | Self::Ledger { replica }
            | Self::Leave { replica } => replica,
        }
    }

    pub fn expected_error(&self) -> Option<&str> {
        match self {
            Self::Create { expect_error, .. }
            | Self::Delete { expect_error, .. }
            | Self::Transfer { expect_error, .. }
            | Self::Balance { expect_error, .. } => expect_error.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create {
                replica,
                client,
                account,
                ..
            } => write!(f, "{client}@{replica} create {account}"),
            Self::Delete {
                replica,
                client,
                account,
                ..
            } => write!(f, "{client}@{replica} delete {account}"),
            Self::Transfer {
                replica,
                client,
                from,
                to,
                amount,
                ..
            } => write!(f, "{client}@{replica} transfer {amount} {from} -> {to}"),
            Self::Balance {
                replica,
                client,
                account,
                ..
            } => write!(f, "{client}@{replica} balance {account}"),
            Self::Activate { replica } => write!(f, "{replica} activate"),
            Self::Deactivate { replica } => write!(f, "{replica} deactivate"),
            Self::Gossip { replica } => write!(f, "{replica} gossip"),
            Self::Isolate { replica } => write!(f, "{replica} isolate"),
            Self::Heal { replica } => write!(f, "{replica} heal"),
            Self::Ledger { replica } => write!(f, "{replica} ledger"),
            Self::Leave { replica } => write!(f, "{replica} leave"),
        }
    }
}

impl ScenarioFile {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let scenario: Self = toml::from_str(content).context("Failed to parse scenario TOML")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid scenario {}", path.display()))
    }

    /// Clock width used by every replica.
    pub fn width(&self) -> usize {
        self.num_replicas.unwrap_or(self.replicas.len())
    }

    /// Node configuration for one replica of this scenario.
    pub fn replica_config(&self, spec: &ReplicaSpec) -> ReplicaConfig {
        ReplicaConfig::new(spec.address.clone(), spec.role)
            .with_service(self.service.clone())
            .with_num_replicas(self.width())
            .with_gossip(spec.gossip.clone())
    }

    pub fn validate(&self) -> Result<()> {
        if self.replicas.is_empty() {
            bail!("scenario '{}' declares no replicas", self.name);
        }
        if self.width() < self.replicas.len() {
            bail!(
                "num_replicas = {} cannot hold {} replicas",
                self.width(),
                self.replicas.len()
            );
        }

        let mut addresses = HashSet::new();
        for spec in &self.replicas {
            if !addresses.insert(spec.address.as_str()) {
                bail!("replica '{}' declared twice", spec.address);
            }
        }
        for (index, step) in self.steps.iter().enumerate() {
            if !addresses.contains(step.replica()) {
                bail!("step {} ({step}) targets unknown replica", index + 1);
            }
        }
        Ok(())
    }
}
