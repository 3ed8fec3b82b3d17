//! Gossip wire format helpers.

use crate::error::{GossipError, GossipResult};
use serde::{Deserialize, Serialize};
use tally_core::{Operation, VectorClock};

pub const GOSSIP_WIRE_SCHEMA_VERSION: u16 = 1;

/// Full-state push from one replica to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagateRequest {
    pub schema_version: u16,
    /// Address the sender is registered under
    pub sender: String,
    /// Sender's whole log at snapshot time
    pub ops: Vec<Operation>,
    /// Sender's `issued_ts` at snapshot time
    pub issued_ts: VectorClock,
}

impl PropagateRequest {
    pub fn new(sender: impl Into<String>, ops: Vec<Operation>, issued_ts: VectorClock) -> Self {
        Self {
            schema_version: GOSSIP_WIRE_SCHEMA_VERSION,
            sender: sender.into(),
            ops,
            issued_ts,
        }
    }

    pub fn encode(&self) -> GossipResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| GossipError::Serialization {
            reason: e.to_string(),
        })
    }

    /// Decode a frame, rejecting garbage and unknown schema versions.
    pub fn decode(frame: &[u8]) -> GossipResult<Self> {
        let request: Self = bincode::deserialize(frame)
            .map_err(|e| GossipError::malformed(format!("undecodable frame: {e}")))?;
        if request.schema_version != GOSSIP_WIRE_SCHEMA_VERSION {
            return Err(GossipError::malformed(format!(
                "unsupported schema version {}",
                request.schema_version
            )));
        }
        Ok(request)
    }
}
