#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]
#![allow(missing_docs)]
//! # Tally Replica - Ledger Replica Node
//!
//! Hosts one [`ReplicaState`](tally_core::ReplicaState) as a concurrent
//! service:
//! - [`ReplicaConfig`]: TOML-backed node configuration
//! - [`ReplicaNode`]: single-lock client/admin API, gossip on write, and
//!   the inbound push endpoint
//!
//! Every entry point holds the state lock for its full duration. Outbound
//! pushes run after the lock is released.

pub mod config;
pub mod error;
pub mod node;

pub use config::ReplicaConfig;
pub use error::{NodeError, NodeResult};
pub use node::ReplicaNode;
