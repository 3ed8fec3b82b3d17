#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]
#![allow(missing_docs)]
//! # Tally CLI - Cluster Scenario Simulator
//!
//! Library half of the `tally-sim` binary: TOML scenario parsing and an
//! in-memory cluster runner that executes client and admin steps with
//! causal session clocks.

pub mod runner;
pub mod scenario;

pub use runner::{ReplicaSummary, ScenarioReport, ScenarioRunner, StepOutcome, StepRecord};
pub use scenario::{ReplicaSpec, ScenarioFile, Step};
