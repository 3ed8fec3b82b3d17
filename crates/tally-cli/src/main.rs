//! Scenario simulator for replicated ledger clusters
//!
//! Boots an in-memory cluster described by a TOML scenario, runs its steps
//! and prints each outcome together with the final replica states.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tally_cli::{ScenarioFile, ScenarioRunner};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tally-sim")]
#[command(about = "Tally - replicated ledger cluster simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging (otherwise RUST_LOG, defaulting to info)
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and report every step
    Run {
        /// Scenario file
        scenario: PathBuf,

        /// Fail unless all replicas end with identical state
        #[arg(long)]
        require_convergence: bool,
    },

    /// Parse and validate a scenario without running it
    Check {
        /// Scenario file
        scenario: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run {
            scenario,
            require_convergence,
        } => {
            let scenario = ScenarioFile::load(&scenario)?;
            let report = ScenarioRunner::boot(scenario).await?.run().await?;
            println!("{report}");

            let mismatches = report.mismatches().count();
            if mismatches > 0 {
                bail!("{mismatches} expectation(s) failed");
            }
            if require_convergence && !report.converged() {
                bail!("replicas did not converge");
            }
        }

        Commands::Check { scenario } => {
            let parsed = ScenarioFile::load(&scenario)?;
            println!(
                "{}: {} replica(s), {} step(s), clock width {}",
                parsed.name,
                parsed.replicas.len(),
                parsed.steps.len(),
                parsed.width()
            );
        }
    }

    Ok(())
}
