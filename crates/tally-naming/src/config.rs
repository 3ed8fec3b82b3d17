//! Registry configuration.

use serde::{Deserialize, Serialize};

/// Default bound on replicas per service.
pub const DEFAULT_MAX_SERVERS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registrations beyond this count are refused
    pub max_servers_per_service: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_servers_per_service: DEFAULT_MAX_SERVERS,
        }
    }
}
