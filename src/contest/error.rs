//! Contest Errors
//!
//! Every failed call surfaces exactly one of these and leaves all state
//! untouched.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::account::{AccountId, Balance, Timestamp};

/// Which commitment failed signature verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Commitment {
    /// Proposer's signature over the transfer terms.
    Alpha,
    /// Counterparty's signature over the alpha signature.
    Beta,
}

impl std::fmt::Display for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alpha => write!(f, "alpha"),
            Self::Beta => write!(f, "beta"),
        }
    }
}

/// Errors from contest, mint and unlock.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContestError {
    /// Caller lacks the privilege for this operation.
    #[error("{caller} is not authorized to {action}")]
    Authorization {
        /// Account that made the call.
        caller: AccountId,
        /// Operation that was refused.
        action: &'static str,
    },

    /// Account already completed a contest and has not unlocked since.
    #[error("account {account} is locked")]
    Locked {
        /// Locked proposing account.
        account: AccountId,
    },

    /// Current time is outside the signed window.
    #[error("time {now} is outside window [{t0}, {t1}]")]
    Temporal {
        /// Time supplied by the host.
        now: Timestamp,
        /// Window start.
        t0: Timestamp,
        /// Window end.
        t1: Timestamp,
    },

    /// Value is below the minimum or otherwise unusable.
    #[error("invalid value {value}: {reason}")]
    Value {
        /// Offending value.
        value: Balance,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// Recovered signer does not match the claimed signer.
    #[error("{commitment} signature does not match")]
    Signature {
        /// Commitment whose signature failed.
        commitment: Commitment,
    },

    /// Paying account cannot cover the transfer.
    #[error("account {account} has {balance}, needs {required}")]
    InsufficientFunds {
        /// Paying account.
        account: AccountId,
        /// Current balance.
        balance: Balance,
        /// Amount requested.
        required: Balance,
    },
}

/// Stable error kind, for wire protocols and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`ContestError::Authorization`].
    Authorization,
    /// See [`ContestError::Locked`].
    Locked,
    /// See [`ContestError::Temporal`].
    Temporal,
    /// See [`ContestError::Value`].
    Value,
    /// See [`ContestError::Signature`].
    Signature,
    /// See [`ContestError::InsufficientFunds`].
    InsufficientFunds,
}

impl ContestError {
    /// Kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authorization { .. } => ErrorKind::Authorization,
            Self::Locked { .. } => ErrorKind::Locked,
            Self::Temporal { .. } => ErrorKind::Temporal,
            Self::Value { .. } => ErrorKind::Value,
            Self::Signature { .. } => ErrorKind::Signature,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
        }
    }
}
