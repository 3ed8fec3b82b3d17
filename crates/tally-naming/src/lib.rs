#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]
#![allow(missing_docs)]
//! # Tally Naming - Replica Discovery
//!
//! Lets replicas find each other by service name and role qualifier:
//! - [`DiscoveryEffects`]: the interface the replication layer consumes
//! - [`NamingRegistry`]: in-process registry implementing it

pub mod config;
pub mod effects;
pub mod error;
pub mod registry;

pub use config::RegistryConfig;
pub use effects::DiscoveryEffects;
pub use error::{NamingError, NamingResult};
pub use registry::{NamingRegistry, ServerEntry, ServerId};
