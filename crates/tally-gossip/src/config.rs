//! Gossip runtime configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GossipConfig {
    /// Push the full log to peers after every successful write
    pub push_on_write: bool,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            push_on_write: true,
        }
    }
}
