//! Replay Locks
//!
//! One slot per proposing account. Each lock or unlock bumps a generation
//! counter; odd generations are locked. Never-seen accounts sit at
//! generation 0 (unlocked).

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::account::AccountId;
use super::error::ContestError;

/// Per-account lock state.
#[derive(Debug, Clone, Default)]
pub struct LockRegistry {
    generations: BTreeMap<AccountId, u64>,
}

impl LockRegistry {
    /// Create an empty registry (every account unlocked).
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored generations.
    pub fn from_generations(generations: BTreeMap<AccountId, u64>) -> Self {
        Self { generations }
    }

    /// Current generation for an account.
    pub fn generation(&self, account: &AccountId) -> u64 {
        self.generations.get(account).copied().unwrap_or(0)
    }

    /// Is the account locked?
    pub fn is_locked(&self, account: &AccountId) -> bool {
        self.generation(account) % 2 == 1
    }

    /// Lock after a successful contest. No-op if already locked.
    pub(crate) fn lock(&mut self, account: &AccountId) {
        if self.is_locked(account) {
            return;
        }
        let generation = self.generations.entry(*account).or_insert(0);
        *generation += 1;
        debug!("Locked {} at generation {}", account.short(), generation);
    }

    /// Clear the lock. Only the account itself may do this.
    ///
    /// Unlocking an account that is not locked succeeds without effect.
    pub fn unlock(&mut self, account: &AccountId, caller: &AccountId) -> Result<(), ContestError> {
        if caller != account {
            return Err(ContestError::Authorization {
                caller: *caller,
                action: "unlock another account",
            });
        }
        if !self.is_locked(account) {
            return Ok(());
        }
        let generation = self.generations.entry(*account).or_insert(0);
        *generation += 1;
        debug!("Unlocked {} at generation {}", account.short(), generation);
        Ok(())
    }

    /// All stored generations (for snapshots).
    pub fn generations(&self) -> &BTreeMap<AccountId, u64> {
        &self.generations
    }
}
