//! Tally core prelude.
//!
//! Curated re-exports for replica hosting and tests.

pub use crate::{
    BalanceReading, LedgerError, LedgerResult, Operation, OperationKind, PropagationReport,
    ReplicaRole, ReplicaState, VectorClock, BROKER_ACCOUNT,
};
