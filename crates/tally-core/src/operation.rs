//! Ledger operations
//!
//! Every mutation is recorded as an [`Operation`]: a closed set of kinds
//! wrapped in a causal envelope (`prev_ts`, `ts`). The accepting replica's
//! index together with its own entry of `ts` identifies the operation.

use crate::clock::VectorClock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What an operation does to the account map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Create { account: String },
    Delete { account: String },
    Transfer { from: String, to: String, amount: i64 },
}

impl OperationKind {
    /// Primary account the operation touches.
    pub fn account(&self) -> &str {
        match self {
            Self::Create { account } | Self::Delete { account } => account,
            Self::Transfer { from, .. } => from,
        }
    }
}

/// Identity of an operation: accepting replica and its counter there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId {
    pub origin: usize,
    pub counter: u64,
}

/// A recorded operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Index of the replica that accepted the operation
    pub origin: usize,
    pub kind: OperationKind,
    /// Clock the issuing client had observed at call time
    pub prev_ts: VectorClock,
    /// Clock assigned by the accepting replica; unique per operation
    pub ts: VectorClock,
}

impl Operation {
    pub fn new(origin: usize, kind: OperationKind, prev_ts: VectorClock, ts: VectorClock) -> Self {
        Self {
            origin,
            kind,
            prev_ts,
            ts,
        }
    }

    pub fn id(&self) -> OperationId {
        OperationId {
            origin: self.origin,
            counter: self.ts.get(self.origin),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            OperationKind::Create { account } => write!(f, "create({account})")?,
            OperationKind::Delete { account } => write!(f, "delete({account})")?,
            OperationKind::Transfer { from, to, amount } => {
                write!(f, "transfer({from} -> {to}, {amount})")?;
            }
        }
        write!(f, " prev={} ts={} origin={}", self.prev_ts, self.ts, self.origin)
    }
}
