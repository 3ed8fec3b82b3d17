//! Replica node errors

use serde::{Deserialize, Serialize};
use tally_core::LedgerError;
use tally_gossip::GossipError;
use tally_naming::NamingError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum NodeError {
    /// Client-visible ledger failure
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Naming(#[from] NamingError),

    #[error(transparent)]
    Gossip(#[from] GossipError),

    /// Another primary already serves this service
    #[error("Primary already registered for '{service}' at {address}")]
    PrimaryAlreadyRegistered { service: String, address: String },

    /// Discovery handed out an id outside the vector clock width
    #[error("Replica index {index} out of range for {num_replicas} replicas")]
    ReplicaIndexOutOfRange { index: usize, num_replicas: usize },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl NodeError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Lift a registration failure, surfacing a refused second primary as
    /// [`NodeError::PrimaryAlreadyRegistered`].
    pub fn registration(error: NamingError) -> Self {
        match error {
            NamingError::PrimaryAlreadyRegistered { service, address } => {
                Self::PrimaryAlreadyRegistered { service, address }
            }
            other => Self::Naming(other),
        }
    }

    /// Stable status code, delegating to the ledger code where there is one.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Ledger(e) => e.code(),
            Self::Naming(NamingError::RegistryFailed { .. }) => "registry_failed",
            Self::Naming(NamingError::RemovalFailed { .. }) => "removal_failed",
            Self::Naming(NamingError::ServiceFull { .. }) => "service_full",
            Self::Naming(NamingError::PrimaryAlreadyRegistered { .. })
            | Self::PrimaryAlreadyRegistered { .. } => "primary_already_registered",
            Self::Gossip(_) => "gossip",
            Self::ReplicaIndexOutOfRange { .. } => "replica_index_out_of_range",
            Self::Config { .. } => "config",
        }
    }
}

pub type NodeResult<T> = std::result::Result<T, NodeError>;
