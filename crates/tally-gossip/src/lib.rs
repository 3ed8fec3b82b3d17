#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]
#![allow(missing_docs)]
//! # Tally Gossip - Full-State Propagation
//!
//! Pushes a replica's whole operation log and issued clock to every peer
//! registered for its service:
//! - [`wire`]: versioned push envelope and its binary encoding
//! - [`transport`]: point-to-point frame delivery and an in-memory network
//! - [`propagator`]: discovery-driven fan-out with per-peer failure isolation
//!
//! ## Design Principles
//!
//! - **Full State**: every push carries the complete log, never a diff
//! - **Fire and Forget**: unreachable peers are skipped without retry; the
//!   write that triggered the push has already succeeded locally
//! - **Lock-Free Sends**: callers capture a snapshot first and push without
//!   holding replica state

pub mod config;
pub mod error;
pub mod propagator;
pub mod transport;
pub mod wire;

pub use config::GossipConfig;
pub use error::{GossipError, GossipResult};
pub use propagator::{GossipPropagator, GossipSnapshot, PushSummary};
pub use transport::{FrameHandler, MemoryNetwork, PeerTransport};
pub use wire::{PropagateRequest, GOSSIP_WIRE_SCHEMA_VERSION};
