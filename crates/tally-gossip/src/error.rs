//! Gossip errors
//!
//! None of these reach the client whose write triggered a push; the
//! propagator logs and drops them per peer.

use serde::{Deserialize, Serialize};
use tally_naming::NamingError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum GossipError {
    #[error("Peer unreachable: {peer}")]
    PeerUnreachable { peer: String },

    /// Receiver could not decode or accept the frame
    #[error("Malformed push: {reason}")]
    MalformedPush { reason: String },

    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Discovery failed: {0}")]
    Discovery(#[from] NamingError),
}

impl GossipError {
    pub fn unreachable(peer: impl Into<String>) -> Self {
        Self::PeerUnreachable { peer: peer.into() }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPush {
            reason: reason.into(),
        }
    }
}

pub type GossipResult<T> = std::result::Result<T, GossipError>;
