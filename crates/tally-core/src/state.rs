//! Per-replica state machine
//!
//! [`ReplicaState`] owns the account map, the operation log and the clock
//! pair of one replica:
//!
//! - `issued_ts[i]`: highest counter of replica `i` this replica has issued
//!   or recorded, applied or not
//! - `applied_ts[i]`: highest counter `k` such that every operation accepted
//!   by replica `i` with a counter up to `k` has been executed here
//!
//! Execution is tracked per [`OperationId`], so an operation runs at most
//! once whether it was applied live or during replay, and `applied_ts` only
//! advances over gap-free prefixes of each replica's operations.
//!
//! `applied_ts` never exceeds `issued_ts` and both only grow. The type is
//! synchronous and lock-free; callers serialize access to it (see the
//! replica node, which guards one instance behind a single mutex).

use crate::accounts::{Accounts, ApplyOutcome, BROKER_ACCOUNT};
use crate::clock::VectorClock;
use crate::errors::{LedgerError, LedgerResult};
use crate::log::OperationLog;
use crate::operation::{Operation, OperationId, OperationKind};
use crate::role::ReplicaRole;
use std::collections::{BTreeMap, HashSet};

/// Balance answer with the clock the client should carry forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceReading {
    pub balance: i64,
    /// Replica `applied_ts` at read time
    pub clock: VectorClock,
}

/// Outcome of folding a peer push into local state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Operations newly appended to the local log
    pub appended: usize,
    /// Operations dropped because their `ts` was already known
    pub duplicates: usize,
    /// Operations whose effect ran during replay
    pub applied: usize,
    /// Operations replayed as no-ops because preconditions no longer held
    pub skipped: usize,
}

impl PropagationReport {
    /// Operations executed by the replay this push triggered.
    pub fn replayed(&self) -> usize {
        self.applied + self.skipped
    }
}

/// Replicated ledger state of a single replica.
#[derive(Debug, Clone)]
pub struct ReplicaState {
    replica: usize,
    role: ReplicaRole,
    active: bool,
    accounts: Accounts,
    log: OperationLog,
    issued_ts: VectorClock,
    applied_ts: VectorClock,
    executed: HashSet<OperationId>,
}

impl ReplicaState {
    /// Fresh replica `replica` of a `num_replicas` wide cluster, seeded with
    /// the broker account.
    pub fn new(replica: usize, num_replicas: usize, role: ReplicaRole) -> Self {
        let width = num_replicas.max(replica + 1);
        tracing::debug!(replica, width, %role, "Initializing replica state");
        Self {
            replica,
            role,
            active: true,
            accounts: Accounts::with_broker(),
            log: OperationLog::new(),
            issued_ts: VectorClock::new(width),
            applied_ts: VectorClock::new(width),
            executed: HashSet::new(),
        }
    }

    pub fn replica_index(&self) -> usize {
        self.replica
    }

    pub fn role(&self) -> ReplicaRole {
        self.role
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn issued_ts(&self) -> &VectorClock {
        &self.issued_ts
    }

    pub fn applied_ts(&self) -> &VectorClock {
        &self.applied_ts
    }

    /// Sorted copy of every account and its balance.
    pub fn accounts(&self) -> BTreeMap<String, i64> {
        self.accounts.snapshot()
    }

    pub fn ledger_len(&self) -> usize {
        self.log.len()
    }

    // === Client operations ===

    /// Record a `Create`, applying it now if `issued_ts` covers `prev_ts`.
    /// Returns the operation's timestamp.
    pub fn create_account(
        &mut self,
        account: &str,
        prev_ts: &VectorClock,
    ) -> LedgerResult<VectorClock> {
        tracing::debug!(replica = self.replica, account, prev = %prev_ts, issued = %self.issued_ts, "Creating account");
        self.ensure_writable()?;
        if self.accounts.contains(account) {
            return Err(LedgerError::already_exists(account));
        }

        let kind = OperationKind::Create {
            account: account.to_string(),
        };
        let counter = self.issued_ts.increment(self.replica);
        let ready = self.issued_ts.dominates(prev_ts);
        if ready {
            self.accounts.apply(&kind);
        } else {
            tracing::debug!(replica = self.replica, account, "Create deferred until causal gap closes");
        }
        Ok(self.record(kind, prev_ts, counter, ready))
    }

    /// Record a `Delete`, applying it now if `issued_ts` covers `prev_ts`.
    pub fn delete_account(
        &mut self,
        account: &str,
        prev_ts: &VectorClock,
    ) -> LedgerResult<VectorClock> {
        tracing::debug!(replica = self.replica, account, prev = %prev_ts, "Deleting account");
        self.ensure_writable()?;
        if account == BROKER_ACCOUNT {
            return Err(LedgerError::delete_broker(account));
        }
        let balance = self
            .accounts
            .balance(account)
            .ok_or_else(|| LedgerError::missing(account))?;
        if balance > 0 {
            return Err(LedgerError::has_balance(account));
        }

        let kind = OperationKind::Delete {
            account: account.to_string(),
        };
        let counter = self.issued_ts.increment(self.replica);
        let ready = self.issued_ts.dominates(prev_ts);
        if ready {
            self.accounts.apply(&kind);
        } else {
            tracing::debug!(replica = self.replica, account, "Delete deferred until causal gap closes");
        }
        Ok(self.record(kind, prev_ts, counter, ready))
    }

    /// Record a `Transfer`.
    ///
    /// Unlike create/delete, readiness is decided against `issued_ts`
    /// *before* the own entry is bumped, and account/funds validation only
    /// runs when the transfer can be applied immediately.
    pub fn transfer(
        &mut self,
        from: &str,
        to: &str,
        amount: i64,
        prev_ts: &VectorClock,
    ) -> LedgerResult<VectorClock> {
        tracing::debug!(replica = self.replica, from, to, amount, prev = %prev_ts, "Transferring");
        self.ensure_writable()?;
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount { amount });
        }

        let ready = self.issued_ts.dominates(prev_ts);
        if ready {
            match (self.accounts.balance(from), self.accounts.contains(to)) {
                (None, false) => return Err(LedgerError::missing_all([from, to])),
                (None, true) => return Err(LedgerError::missing(from)),
                (Some(_), false) => return Err(LedgerError::missing(to)),
                (Some(balance), true) if balance < amount => {
                    return Err(LedgerError::insufficient_funds(from));
                }
                (Some(_), true) => {}
            }
        }

        let kind = OperationKind::Transfer {
            from: from.to_string(),
            to: to.to_string(),
            amount,
        };
        let counter = self.issued_ts.increment(self.replica);
        if ready {
            self.accounts.apply(&kind);
        } else {
            tracing::debug!(replica = self.replica, from, to, "Transfer deferred until causal gap closes");
        }
        Ok(self.record(kind, prev_ts, counter, ready))
    }

    /// Causal read: rejected while `applied_ts` does not cover `prev_ts`.
    pub fn balance(&self, account: &str, prev_ts: &VectorClock) -> LedgerResult<BalanceReading> {
        self.ensure_active()?;
        if !self.applied_ts.dominates(prev_ts) {
            tracing::debug!(replica = self.replica, account, prev = %prev_ts, applied = %self.applied_ts, "Read not stable");
            return Err(LedgerError::OperationNotStable);
        }
        let balance = self
            .accounts
            .balance(account)
            .ok_or_else(|| LedgerError::missing(account))?;
        Ok(BalanceReading {
            balance,
            clock: self.applied_ts.clone(),
        })
    }

    // === Admin operations ===

    pub fn activate(&mut self) {
        tracing::debug!(replica = self.replica, "Activating replica");
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        tracing::debug!(replica = self.replica, "Deactivating replica");
        self.active = false;
    }

    /// Detached copy of the full operation log.
    pub fn ledger(&self) -> Vec<Operation> {
        self.log.snapshot()
    }

    // === Replication ===

    /// Fold a peer push into local state, then replay to a fixpoint.
    ///
    /// Known operations (same `ts`) are dropped, new ones are appended
    /// unapplied, `peer_issued_ts` is merged into `issued_ts`, and the whole
    /// log is rescanned until a full pass executes nothing new. An operation
    /// executes once `applied_ts` covers its `prev_ts` and never twice.
    pub fn propagate(
        &mut self,
        ops: Vec<Operation>,
        peer_issued_ts: &VectorClock,
    ) -> PropagationReport {
        let mut report = PropagationReport::default();
        for op in ops {
            let ts = op.ts.clone();
            if self.log.append_if_new(op) {
                tracing::debug!(replica = self.replica, ts = %ts, "Recorded propagated operation");
                // Recorded counts as issued, keeping applied_ts <= issued_ts
                self.issued_ts.merge(&ts);
                report.appended += 1;
            } else {
                tracing::debug!(replica = self.replica, ts = %ts, "Ignoring duplicate operation");
                report.duplicates += 1;
            }
        }

        tracing::debug!(replica = self.replica, peer = %peer_issued_ts, local = %self.issued_ts, "Merging peer issued clock");
        self.issued_ts.merge(peer_issued_ts);
        self.replay(&mut report);
        report
    }

    fn replay(&mut self, report: &mut PropagationReport) {
        loop {
            let mut progressed = false;
            for op in self.log.iter() {
                let id = op.id();
                if self.executed.contains(&id) || !self.applied_ts.dominates(&op.prev_ts) {
                    continue;
                }
                match self.accounts.apply(&op.kind) {
                    ApplyOutcome::Applied => report.applied += 1,
                    ApplyOutcome::Skipped => {
                        tracing::debug!(replica = self.replica, op = %op, "Replayed operation no longer applicable");
                        report.skipped += 1;
                    }
                }
                tracing::debug!(replica = self.replica, op = %op, "Executed propagated operation");
                mark_executed(&mut self.executed, &mut self.applied_ts, id);
                progressed = true;
            }
            if !progressed {
                break;
            }
        }
    }

    // === Guards ===

    fn ensure_active(&self) -> LedgerResult<()> {
        if self.active {
            Ok(())
        } else {
            Err(LedgerError::ServerUnavailable)
        }
    }

    fn ensure_writable(&self) -> LedgerResult<()> {
        if !self.role.accepts_writes() {
            return Err(LedgerError::SecondaryWriteRejected);
        }
        self.ensure_active()
    }

    /// Stamp and append a client operation; `applied` marks it executed.
    fn record(
        &mut self,
        kind: OperationKind,
        prev_ts: &VectorClock,
        counter: u64,
        applied: bool,
    ) -> VectorClock {
        let ts = self.issued_ts.clone();
        let op = Operation::new(self.replica, kind, prev_ts.clone(), ts.clone());
        tracing::debug!(replica = self.replica, op = %op, applied, "Appending operation");
        self.log.append(op);
        if applied {
            let id = OperationId {
                origin: self.replica,
                counter,
            };
            mark_executed(&mut self.executed, &mut self.applied_ts, id);
        }
        ts
    }
}

/// Record `id` as executed and advance `applied_ts[origin]` across every
/// contiguously executed counter.
fn mark_executed(executed: &mut HashSet<OperationId>, applied_ts: &mut VectorClock, id: OperationId) {
    executed.insert(id);
    let origin = id.origin;
    loop {
        let next = OperationId {
            origin,
            counter: applied_ts.get(origin) + 1,
        };
        if !executed.contains(&next) {
            break;
        }
        applied_ts.merge_entry(origin, next.counter);
    }
}
