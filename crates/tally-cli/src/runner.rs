//! Scenario execution against an in-memory cluster
//!
//! Boots one [`ReplicaNode`] per declared replica on a shared
//! [`MemoryNetwork`] and naming registry, then runs the steps in order.
//! Ledger errors are recorded as step outcomes rather than aborting the
//! run; only expectation mismatches fail a scenario.

use crate::scenario::{ScenarioFile, Step};
use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tally_core::{BalanceReading, LedgerError, LedgerResult, Operation, ReplicaRole, VectorClock};
use tally_gossip::{MemoryNetwork, PushSummary};
use tally_naming::{DiscoveryEffects, NamingRegistry};
use tally_replica::ReplicaNode;

/// Result of one executed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Write accepted; carries the operation timestamp
    Stamped(VectorClock),
    Balance(BalanceReading),
    /// Call refused by the replica
    Rejected(LedgerError),
    Ledger(Vec<Operation>),
    Pushed(PushSummary),
    Done,
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stamped(ts) => write!(f, "ok ts={ts}"),
            Self::Balance(reading) => write!(f, "balance={} clock={}", reading.balance, reading.clock),
            Self::Rejected(e) => write!(f, "error [{}] {e}", e.code()),
            Self::Ledger(ops) => {
                write!(f, "{} operation(s)", ops.len())?;
                for op in ops {
                    write!(f, "\n      {op}")?;
                }
                Ok(())
            }
            Self::Pushed(summary) => write!(
                f,
                "pushed to {}/{} peer(s)",
                summary.delivered,
                summary.peers.len()
            ),
            Self::Done => f.write_str("ok"),
        }
    }
}

/// One executed step with its outcome.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub step: Step,
    pub outcome: StepOutcome,
    /// Set when the outcome contradicts the step's expectation
    pub mismatch: Option<String>,
}

/// Final view of one replica after the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaSummary {
    pub address: String,
    pub role: ReplicaRole,
    pub replica: usize,
    pub applied_ts: VectorClock,
    pub issued_ts: VectorClock,
    pub accounts: BTreeMap<String, i64>,
}

#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: String,
    pub records: Vec<StepRecord>,
    pub replicas: Vec<ReplicaSummary>,
}

impl ScenarioReport {
    pub fn mismatches(&self) -> impl Iterator<Item = &str> {
        self.records
            .iter()
            .filter_map(|record| record.mismatch.as_deref())
    }

    pub fn passed(&self) -> bool {
        self.mismatches().next().is_none()
    }

    /// True when every replica holds the same accounts and applied clock.
    pub fn converged(&self) -> bool {
        self.replicas.windows(2).all(|pair| {
            pair[0].accounts == pair[1].accounts && pair[0].applied_ts == pair[1].applied_ts
        })
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scenario: {}", self.name)?;
        for (index, record) in self.records.iter().enumerate() {
            writeln!(f, "  [{:>2}] {} => {}", index + 1, record.step, record.outcome)?;
            if let Some(mismatch) = &record.mismatch {
                writeln!(f, "       MISMATCH: {mismatch}")?;
            }
        }
        writeln!(f, "Replicas:")?;
        for replica in &self.replicas {
            writeln!(
                f,
                "  {} ({}, #{}) applied={} issued={}",
                replica.address, replica.role, replica.replica, replica.applied_ts, replica.issued_ts
            )?;
            for (account, balance) in &replica.accounts {
                writeln!(f, "      {account}: {balance}")?;
            }
        }
        write!(
            f,
            "Converged: {}",
            if self.converged() { "yes" } else { "no" }
        )
    }
}

/// Live cluster plus per-client session clocks.
pub struct ScenarioRunner {
    scenario: ScenarioFile,
    network: Arc<MemoryNetwork>,
    registry: Arc<NamingRegistry>,
    nodes: BTreeMap<String, Arc<ReplicaNode>>,
    sessions: BTreeMap<String, VectorClock>,
}

impl ScenarioRunner {
    /// Start every replica in declaration order.
    pub async fn boot(scenario: ScenarioFile) -> Result<Self> {
        let network = Arc::new(MemoryNetwork::new());
        let registry = Arc::new(NamingRegistry::default());
        let mut nodes = BTreeMap::new();

        for spec in &scenario.replicas {
            let discovery: Arc<dyn DiscoveryEffects> = registry.clone();
            let node = ReplicaNode::join(scenario.replica_config(spec), discovery, &network)
                .await
                .with_context(|| format!("Failed to start replica {}", spec.address))?;
            nodes.insert(spec.address.clone(), node);
        }
        tracing::info!(scenario = %scenario.name, replicas = nodes.len(), "Cluster booted");

        Ok(Self {
            scenario,
            network,
            registry,
            nodes,
            sessions: BTreeMap::new(),
        })
    }

    pub fn registry(&self) -> &NamingRegistry {
        &self.registry
    }

    pub fn network(&self) -> &MemoryNetwork {
        &self.network
    }

    pub fn node(&self, address: &str) -> Result<&Arc<ReplicaNode>> {
        self.nodes
            .get(address)
            .ok_or_else(|| anyhow!("unknown replica {address}"))
    }

    /// Current clock of a client session.
    pub fn session(&self, client: &str) -> VectorClock {
        self.sessions
            .get(client)
            .cloned()
            .unwrap_or_else(|| VectorClock::new(self.scenario.width()))
    }

    fn observe(&mut self, client: &str, clock: &VectorClock) {
        let width = self.scenario.width();
        self.sessions
            .entry(client.to_string())
            .or_insert_with(|| VectorClock::new(width))
            .merge(clock);
    }

    fn record_write(&mut self, client: &str, result: LedgerResult<VectorClock>) -> StepOutcome {
        match result {
            Ok(ts) => {
                self.observe(client, &ts);
                StepOutcome::Stamped(ts)
            }
            Err(e) => StepOutcome::Rejected(e),
        }
    }

    /// Execute one step.
    pub async fn step(&mut self, step: &Step) -> Result<StepOutcome> {
        let node = Arc::clone(self.node(step.replica())?);
        tracing::debug!(step = %step, "Running step");

        let outcome = match step {
            Step::Create {
                client, account, ..
            } => {
                let prev = self.session(client);
                let result = node.create_account(account, &prev).await;
                self.record_write(client, result)
            }
            Step::Delete {
                client, account, ..
            } => {
                let prev = self.session(client);
                let result = node.delete_account(account, &prev).await;
                self.record_write(client, result)
            }
            Step::Transfer {
                client,
                from,
                to,
                amount,
                ..
            } => {
                let prev = self.session(client);
                let result = node.transfer(from, to, *amount, &prev).await;
                self.record_write(client, result)
            }
            Step::Balance {
                client, account, ..
            } => match node.balance(account, &self.session(client)) {
                Ok(reading) => {
                    self.observe(client, &reading.clock);
                    StepOutcome::Balance(reading)
                }
                Err(e) => StepOutcome::Rejected(e),
            },
            Step::Activate { .. } => {
                node.activate();
                StepOutcome::Done
            }
            Step::Deactivate { .. } => {
                node.deactivate();
                StepOutcome::Done
            }
            Step::Gossip { .. } => StepOutcome::Pushed(node.gossip().await),
            Step::Isolate { replica } => {
                self.network.isolate(replica);
                StepOutcome::Done
            }
            Step::Heal { replica } => {
                self.network.heal(replica);
                StepOutcome::Done
            }
            Step::Ledger { .. } => StepOutcome::Ledger(node.ledger()),
            Step::Leave { replica } => {
                node.leave().await?;
                self.network.unbind(replica);
                StepOutcome::Done
            }
        };
        Ok(outcome)
    }

    /// Run every step, then summarize each replica.
    pub async fn run(mut self) -> Result<ScenarioReport> {
        let steps = self.scenario.steps.clone();
        let mut records = Vec::with_capacity(steps.len());
        for step in steps {
            let outcome = self.step(&step).await?;
            let mismatch = check_expectation(&step, &outcome);
            if let Some(mismatch) = &mismatch {
                tracing::warn!(step = %step, mismatch = %mismatch, "Expectation failed");
            }
            records.push(StepRecord {
                step,
                outcome,
                mismatch,
            });
        }

        Ok(ScenarioReport {
            name: self.scenario.name.clone(),
            records,
            replicas: self.summaries(),
        })
    }

    pub fn summaries(&self) -> Vec<ReplicaSummary> {
        self.scenario
            .replicas
            .iter()
            .filter_map(|spec| self.nodes.get(&spec.address))
            .map(|node| ReplicaSummary {
                address: node.address().to_string(),
                role: node.role(),
                replica: node.replica_index(),
                applied_ts: node.applied_ts(),
                issued_ts: node.issued_ts(),
                accounts: node.accounts(),
            })
            .collect()
    }
}

fn check_expectation(step: &Step, outcome: &StepOutcome) -> Option<String> {
    match (step.expected_error(), outcome) {
        (Some(code), StepOutcome::Rejected(e)) if e.code() == code => None,
        (Some(code), StepOutcome::Rejected(e)) => {
            Some(format!("expected error {code}, got {}", e.code()))
        }
        (Some(code), other) => Some(format!("expected error {code}, got {other}")),
        (None, StepOutcome::Balance(reading)) => match step {
            Step::Balance {
                expect_balance: Some(expected),
                ..
            } if *expected != reading.balance => Some(format!(
                "expected balance {expected}, got {}",
                reading.balance
            )),
            _ => None,
        },
        (None, StepOutcome::Rejected(e)) => match step {
            Step::Balance {
                expect_balance: Some(expected),
                ..
            } => Some(format!("expected balance {expected}, got error {}", e.code())),
            _ => None,
        },
        (None, _) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance_step(expect_balance: Option<i64>, expect_error: Option<&str>) -> Step {
        Step::Balance {
            replica: "h:1".to_string(),
            client: "c".to_string(),
            account: "alice".to_string(),
            expect_balance,
            expect_error: expect_error.map(str::to_string),
        }
    }

    fn reading(balance: i64) -> StepOutcome {
        StepOutcome::Balance(BalanceReading {
            balance,
            clock: VectorClock::new(1),
        })
    }

    #[test]
    fn test_expectations() {
        assert_eq!(check_expectation(&balance_step(Some(3), None), &reading(3)), None);
        assert!(check_expectation(&balance_step(Some(3), None), &reading(4)).is_some());
        assert!(check_expectation(
            &balance_step(Some(3), None),
            &StepOutcome::Rejected(LedgerError::OperationNotStable)
        )
        .is_some());
        assert_eq!(
            check_expectation(
                &balance_step(None, Some("operation_not_stable")),
                &StepOutcome::Rejected(LedgerError::OperationNotStable)
            ),
            None
        );
        assert!(check_expectation(&balance_step(None, Some("operation_not_stable")), &reading(0)).is_some());
        assert_eq!(
            check_expectation(&balance_step(None, None), &StepOutcome::Rejected(LedgerError::ServerUnavailable)),
            None
        );
    }
}
