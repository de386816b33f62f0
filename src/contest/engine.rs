//! Contest Engine
//!
//! Executes a signed two-party transfer:
//!
//! ```text
//! 1. from unlocked?            -> Locked
//! 2. t0 <= now <= t1?          -> Temporal
//! 3. value >= min_value?       -> Value
//! 4. alpha signed by from?     -> Signature(alpha)
//! 5. beta signed by to?        -> Signature(beta)
//! 6. ledger.transfer(value)    -> InsufficientFunds
//! 7. lock(from)
//! 8. emit ContestStarted
//! ```
//!
//! Steps 1-5 only read state and step 6 is the first write, so a failure
//! at any step leaves the ledger and locks exactly as they were.

use serde::{Serialize, Deserialize};
use tracing::{debug, info, instrument};

use crate::core::account::{AccountId, Balance, Timestamp};
use crate::core::codec::{encode_alpha, encode_beta, AlphaCommitment};
use crate::core::signature::{verify, Signature};
use super::error::{Commitment, ContestError};
use super::events::{ContestStarted, NotificationSink};
use super::ledger::{Ledger, MemoryLedger};
use super::lock::LockRegistry;

/// Engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestConfig {
    /// Smallest transferable value. Values below 1 are treated as 1.
    pub min_value: Balance,
}

impl Default for ContestConfig {
    fn default() -> Self {
        Self { min_value: 1 }
    }
}

impl ContestConfig {
    fn effective_min_value(&self) -> Balance {
        self.min_value.max(1)
    }
}

/// A contest submission: transfer terms plus both signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestRequest {
    /// Paying account; must have signed alpha.
    pub from: AccountId,
    /// Receiving account; must have signed beta.
    pub to: AccountId,
    /// Amount to move.
    pub value: Balance,
    /// Window start (inclusive).
    pub t0: Timestamp,
    /// Window end (inclusive).
    pub t1: Timestamp,
    /// `from`'s signature over the alpha encoding.
    pub alpha_signature: Signature,
    /// `to`'s signature over the beta encoding of `alpha_signature`.
    pub beta_signature: Signature,
}

impl ContestRequest {
    /// Alpha terms claimed by this request.
    pub fn alpha(&self) -> AlphaCommitment {
        AlphaCommitment::new(self.from, self.to, self.value, self.t0, self.t1)
    }
}

/// Contest/lock state machine on top of a ledger.
pub struct ContestEngine<L = MemoryLedger, S = ()> {
    config: ContestConfig,
    ledger: L,
    locks: LockRegistry,
    sink: S,
}

impl<L: Ledger, S: NotificationSink> ContestEngine<L, S> {
    /// Create an engine with every account unlocked.
    pub fn new(config: ContestConfig, ledger: L, sink: S) -> Self {
        Self::with_locks(config, ledger, LockRegistry::new(), sink)
    }

    /// Create an engine with existing lock state.
    pub fn with_locks(config: ContestConfig, ledger: L, locks: LockRegistry, sink: S) -> Self {
        Self { config, ledger, locks, sink }
    }

    /// Run a contest at time `now`.
    ///
    /// `caller` may be any account; authority comes from the signatures.
    #[instrument(level = "debug", skip_all, fields(caller = %caller.short(), from = %request.from.short()))]
    pub fn contest(
        &mut self,
        caller: &AccountId,
        request: &ContestRequest,
        now: Timestamp,
    ) -> Result<ContestStarted, ContestError> {
        match self.execute(request, now) {
            Ok(event) => {
                info!(
                    "Contest {} -> {} for {} accepted (window [{}, {}], now {})",
                    event.from.short(), event.to.short(), event.value, event.t0, event.t1, now
                );
                Ok(event)
            }
            Err(e) => {
                debug!("Contest rejected: {}", e);
                Err(e)
            }
        }
    }

    fn execute(&mut self, request: &ContestRequest, now: Timestamp) -> Result<ContestStarted, ContestError> {
        self.check(request, now)?;

        self.ledger.transfer(&request.from, &request.to, request.value)?;
        self.locks.lock(&request.from);

        let event = ContestStarted {
            from: request.from,
            to: request.to,
            value: request.value,
            t0: request.t0,
            t1: request.t1,
        };
        self.sink.notify(&event);
        Ok(event)
    }

    /// Steps 1-5. Read-only.
    fn check(&self, request: &ContestRequest, now: Timestamp) -> Result<(), ContestError> {
        if self.locks.is_locked(&request.from) {
            return Err(ContestError::Locked { account: request.from });
        }

        if now < request.t0 || now > request.t1 {
            return Err(ContestError::Temporal { now, t0: request.t0, t1: request.t1 });
        }

        if request.value < self.config.effective_min_value() {
            return Err(ContestError::Value {
                value: request.value,
                reason: "below minimum transfer value",
            });
        }

        // Both messages are rebuilt from the submitted terms, never taken as given.
        let alpha_message = encode_alpha(&request.from, &request.to, request.value, request.t0, request.t1);
        if !verify(&alpha_message, &request.from, &request.alpha_signature) {
            return Err(ContestError::Signature { commitment: Commitment::Alpha });
        }

        let beta_message = encode_beta(&request.alpha_signature);
        if !verify(&beta_message, &request.to, &request.beta_signature) {
            return Err(ContestError::Signature { commitment: Commitment::Beta });
        }

        Ok(())
    }

    /// Mint new tokens. Owner only.
    #[instrument(level = "debug", skip_all, fields(to = %to.short(), amount = amount, caller = %caller.short()))]
    pub fn mint(&mut self, to: &AccountId, amount: Balance, caller: &AccountId) -> Result<(), ContestError> {
        self.ledger.mint(to, amount, caller)?;
        info!("Minted {} to {} (supply {})", amount, to.short(), self.ledger.total_supply());
        Ok(())
    }

    /// Clear `account`'s lock. Only `account` itself may do this.
    pub fn unlock(&mut self, account: &AccountId, caller: &AccountId) -> Result<(), ContestError> {
        let was_locked = self.locks.is_locked(account);
        self.locks.unlock(account, caller)?;
        if was_locked {
            info!("Account {} unlocked", account.short());
        }
        Ok(())
    }

    /// Balance of an account.
    pub fn balance_of(&self, account: &AccountId) -> Balance {
        self.ledger.balance_of(account)
    }

    /// Total token supply.
    pub fn total_supply(&self) -> Balance {
        self.ledger.total_supply()
    }

    /// Minting authority.
    pub fn owner(&self) -> AccountId {
        self.ledger.owner()
    }

    /// Is the account locked?
    pub fn is_locked(&self, account: &AccountId) -> bool {
        self.locks.is_locked(account)
    }

    /// Lock generation of an account.
    pub fn lock_generation(&self, account: &AccountId) -> u64 {
        self.locks.generation(account)
    }

    /// Engine configuration.
    pub fn config(&self) -> &ContestConfig {
        &self.config
    }

    /// Underlying ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Lock registry.
    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    /// Notification sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }
}
