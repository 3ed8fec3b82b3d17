//! Account balances and the idempotent apply primitive

use crate::operation::OperationKind;
use std::collections::BTreeMap;

/// Name of the privileged account seeded on every replica.
pub const BROKER_ACCOUNT: &str = "broker";

/// Balance the broker starts with.
pub const BROKER_INITIAL_BALANCE: i64 = 1000;

/// Result of running an operation's effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// Preconditions did not hold; state is untouched
    Skipped,
}

/// Account map of one replica. Balances never go negative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accounts {
    balances: BTreeMap<String, i64>,
}

impl Accounts {
    /// Fresh map holding only the funded broker account.
    pub fn with_broker() -> Self {
        let mut balances = BTreeMap::new();
        balances.insert(BROKER_ACCOUNT.to_string(), BROKER_INITIAL_BALANCE);
        Self { balances }
    }

    pub fn contains(&self, account: &str) -> bool {
        self.balances.contains_key(account)
    }

    pub fn balance(&self, account: &str) -> Option<i64> {
        self.balances.get(account).copied()
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Sorted copy of every account and balance.
    pub fn snapshot(&self) -> BTreeMap<String, i64> {
        self.balances.clone()
    }

    /// Run the effect of `kind` if its preconditions hold, otherwise leave
    /// the map untouched.
    ///
    /// Shared by the live write path and by deferred replay, so applying
    /// an operation whose preconditions no longer hold is a silent no-op:
    /// - `Create` of an existing account
    /// - `Delete` of a missing, broker or non-empty account
    /// - `Transfer` with a missing side, a non-positive amount or
    ///   insufficient funds
    pub fn apply(&mut self, kind: &OperationKind) -> ApplyOutcome {
        match kind {
            OperationKind::Create { account } => {
                if self.contains(account) {
                    return ApplyOutcome::Skipped;
                }
                self.balances.insert(account.clone(), 0);
                ApplyOutcome::Applied
            }
            OperationKind::Delete { account } => {
                if account == BROKER_ACCOUNT {
                    return ApplyOutcome::Skipped;
                }
                match self.balance(account) {
                    Some(0) => {
                        self.balances.remove(account);
                        ApplyOutcome::Applied
                    }
                    _ => ApplyOutcome::Skipped,
                }
            }
            OperationKind::Transfer { from, to, amount } => {
                self.transfer(from, to, *amount)
            }
        }
    }

    fn transfer(&mut self, from: &str, to: &str, amount: i64) -> ApplyOutcome {
        if amount <= 0 || !self.contains(to) {
            return ApplyOutcome::Skipped;
        }
        match self.balances.get_mut(from) {
            Some(balance) if *balance >= amount => *balance -= amount,
            _ => return ApplyOutcome::Skipped,
        }
        if let Some(balance) = self.balances.get_mut(to) {
            *balance += amount;
        }
        ApplyOutcome::Applied
    }
}

impl Default for Accounts {
    fn default() -> Self {
        Self::with_broker()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(account: &str) -> OperationKind {
        OperationKind::Create {
            account: account.to_string(),
        }
    }

    fn delete(account: &str) -> OperationKind {
        OperationKind::Delete {
            account: account.to_string(),
        }
    }

    fn transfer(from: &str, to: &str, amount: i64) -> OperationKind {
        OperationKind::Transfer {
            from: from.to_string(),
            to: to.to_string(),
            amount,
        }
    }

    #[test]
    fn test_starts_with_funded_broker() {
        let accounts = Accounts::with_broker();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts.balance(BROKER_ACCOUNT), Some(1000));
    }

    #[test]
    fn test_create_twice_is_noop() {
        let mut accounts = Accounts::with_broker();
        assert_eq!(accounts.apply(&create("alice")), ApplyOutcome::Applied);
        assert_eq!(accounts.apply(&create("alice")), ApplyOutcome::Skipped);
        assert_eq!(accounts.balance("alice"), Some(0));
    }

    #[test]
    fn test_delete_guards() {
        let mut accounts = Accounts::with_broker();
        assert_eq!(accounts.apply(&delete("ghost")), ApplyOutcome::Skipped);
        assert_eq!(accounts.apply(&delete(BROKER_ACCOUNT)), ApplyOutcome::Skipped);

        accounts.apply(&create("alice"));
        accounts.apply(&transfer(BROKER_ACCOUNT, "alice", 5));
        assert_eq!(accounts.apply(&delete("alice")), ApplyOutcome::Skipped);

        accounts.apply(&transfer("alice", BROKER_ACCOUNT, 5));
        assert_eq!(accounts.apply(&delete("alice")), ApplyOutcome::Applied);
        assert!(!accounts.contains("alice"));
    }

    #[test]
    fn test_transfer_moves_funds() {
        let mut accounts = Accounts::with_broker();
        accounts.apply(&create("alice"));
        assert_eq!(
            accounts.apply(&transfer(BROKER_ACCOUNT, "alice", 300)),
            ApplyOutcome::Applied
        );
        assert_eq!(accounts.balance(BROKER_ACCOUNT), Some(700));
        assert_eq!(accounts.balance("alice"), Some(300));
    }

    #[test]
    fn test_transfer_skips_when_preconditions_fail() {
        let mut accounts = Accounts::with_broker();
        accounts.apply(&create("alice"));
        let before = accounts.clone();

        assert_eq!(accounts.apply(&transfer("alice", BROKER_ACCOUNT, 1)), ApplyOutcome::Skipped);
        assert_eq!(accounts.apply(&transfer(BROKER_ACCOUNT, "ghost", 1)), ApplyOutcome::Skipped);
        assert_eq!(accounts.apply(&transfer("ghost", "alice", 1)), ApplyOutcome::Skipped);
        assert_eq!(accounts.apply(&transfer(BROKER_ACCOUNT, "alice", 0)), ApplyOutcome::Skipped);
        assert_eq!(accounts, before);
    }

    #[test]
    fn test_self_transfer_keeps_balance() {
        let mut accounts = Accounts::with_broker();
        accounts.apply(&transfer(BROKER_ACCOUNT, BROKER_ACCOUNT, 10));
        assert_eq!(accounts.balance(BROKER_ACCOUNT), Some(1000));
    }
}
