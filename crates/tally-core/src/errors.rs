//! Ledger error taxonomy
//!
//! Every variant is a caller-recoverable condition that is reported
//! synchronously to the originating call.

use serde::{Deserialize, Serialize};

/// Errors raised by the replica state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum LedgerError {
    /// Replica was deactivated by an administrator
    #[error("Server unavailable")]
    ServerUnavailable,

    /// Write attempted on a read-only secondary replica
    #[error("Secondary replica rejects write operations")]
    SecondaryWriteRejected,

    #[error("Account '{account}' already exists")]
    AccountAlreadyExists {
        /// Name that collided
        account: String,
    },

    /// One or more named accounts are missing
    #[error("Account(s) {} do not exist", quoted(.accounts))]
    AccountDoesntExist {
        /// Every missing account, in argument order
        accounts: Vec<String>,
    },

    #[error("Account '{account}' is the broker and cannot be deleted")]
    DeleteBrokerAccount {
        /// Broker account name
        account: String,
    },

    #[error("Account '{account}' still has a balance")]
    AccountHasBalance {
        /// Account that could not be deleted
        account: String,
    },

    #[error("Transfer amount must be positive, got {amount}")]
    InvalidAmount {
        /// Rejected amount
        amount: i64,
    },

    #[error("Account '{account}' has insufficient funds")]
    InsufficientFunds {
        /// Debited account
        account: String,
    },

    /// Replica has not applied everything the client already observed
    #[error("Operation not stable on this replica yet")]
    OperationNotStable,
}

fn quoted(accounts: &[String]) -> String {
    accounts
        .iter()
        .map(|account| format!("'{account}'"))
        .collect::<Vec<_>>()
        .join(" and ")
}

impl LedgerError {
    pub fn already_exists(account: impl Into<String>) -> Self {
        Self::AccountAlreadyExists {
            account: account.into(),
        }
    }

    pub fn missing(account: impl Into<String>) -> Self {
        Self::AccountDoesntExist {
            accounts: vec![account.into()],
        }
    }

    /// Missing-account error naming several accounts at once
    pub fn missing_all<I, S>(accounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AccountDoesntExist {
            accounts: accounts.into_iter().map(Into::into).collect(),
        }
    }

    pub fn delete_broker(account: impl Into<String>) -> Self {
        Self::DeleteBrokerAccount {
            account: account.into(),
        }
    }

    pub fn has_balance(account: impl Into<String>) -> Self {
        Self::AccountHasBalance {
            account: account.into(),
        }
    }

    pub fn insufficient_funds(account: impl Into<String>) -> Self {
        Self::InsufficientFunds {
            account: account.into(),
        }
    }

    /// Stable status code for the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ServerUnavailable => "server_unavailable",
            Self::SecondaryWriteRejected => "secondary_write_rejected",
            Self::AccountAlreadyExists { .. } => "account_already_exists",
            Self::AccountDoesntExist { .. } => "account_doesnt_exist",
            Self::DeleteBrokerAccount { .. } => "delete_broker_account",
            Self::AccountHasBalance { .. } => "account_has_balance",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::OperationNotStable => "operation_not_stable",
        }
    }
}

/// Standard Result type for ledger operations
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
