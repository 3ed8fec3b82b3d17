//! Replica roles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Replication role, fixed at process startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicaRole {
    /// Full read/write replica
    #[default]
    #[serde(alias = "A")]
    Primary,
    /// Read-only replica; still applies propagated operations
    #[serde(alias = "B")]
    Secondary,
}

impl ReplicaRole {
    /// Accepts local mutating calls.
    pub fn accepts_writes(self) -> bool {
        matches!(self, Self::Primary)
    }
}

impl fmt::Display for ReplicaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Secondary => f.write_str("secondary"),
        }
    }
}

/// Unrecognised role name or qualifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown replica role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for ReplicaRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" | "primary" => Ok(Self::Primary),
            "B" | "secondary" => Ok(Self::Secondary),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}
