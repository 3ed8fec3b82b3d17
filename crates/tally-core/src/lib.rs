#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]
#![allow(missing_docs, clippy::len_without_is_empty)]
//! # Tally Core - Replicated Ledger State Machine
//!
//! This crate provides the per-replica core of the replicated ledger:
//! - Vector clocks with dominance, merge and own-entry increment
//! - Append-only operation log with timestamp deduplication
//! - Account map with an idempotent apply primitive
//! - The replica state machine: client operations, causal reads and
//!   fixpoint replay of propagated operations
//!
//! ## Design Principles
//!
//! - **Causal Preconditions**: every operation carries the client's observed
//!   clock and only takes effect once the replica has caught up with it
//! - **Idempotent Replay**: re-applying an operation whose preconditions no
//!   longer hold is a silent no-op, so replay is always safe
//! - **Full-State Gossip**: peers exchange whole logs; deduplication by
//!   timestamp makes redelivery harmless
//! - **Single Owner**: state is a plain struct; the hosting service guards
//!   it with one lock

pub mod accounts;
pub mod clock;
pub mod errors;
pub mod log;
pub mod operation;
pub mod prelude;
pub mod role;
pub mod state;

pub use accounts::{Accounts, ApplyOutcome, BROKER_ACCOUNT, BROKER_INITIAL_BALANCE};
pub use clock::VectorClock;
pub use errors::{LedgerError, LedgerResult};
pub use log::OperationLog;
pub use operation::{Operation, OperationId, OperationKind};
pub use role::{ReplicaRole, UnknownRole};
pub use state::{BalanceReading, PropagationReport, ReplicaState};
