//! Token Ledger
//!
//! Balances, total supply and owner-gated minting. The contest engine only
//! ever moves value through [`Ledger::transfer`].

use std::collections::BTreeMap;

use crate::core::account::{AccountId, Balance};
use super::error::ContestError;

/// Ledger collaborator used by the contest engine.
///
/// Failing calls must not mutate anything.
pub trait Ledger {
    /// Account allowed to mint.
    fn owner(&self) -> AccountId;

    /// Balance of an account (0 if never seen).
    fn balance_of(&self, account: &AccountId) -> Balance;

    /// Sum of all balances.
    fn total_supply(&self) -> Balance;

    /// Create `amount` new tokens for `account`. Owner only.
    fn mint(&mut self, account: &AccountId, amount: Balance, caller: &AccountId) -> Result<(), ContestError>;

    /// Move `amount` from `from` to `to`.
    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: Balance) -> Result<(), ContestError>;
}

/// In-memory ledger.
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    owner: AccountId,
    balances: BTreeMap<AccountId, Balance>,
    total_supply: Balance,
}

impl MemoryLedger {
    /// Create an empty ledger administered by `owner`.
    pub fn new(owner: AccountId) -> Self {
        Self {
            owner,
            balances: BTreeMap::new(),
            total_supply: 0,
        }
    }

    /// Rebuild from stored balances.
    ///
    /// Returns `None` if the balances do not add up to `total_supply`.
    pub fn from_parts(
        owner: AccountId,
        balances: BTreeMap<AccountId, Balance>,
        total_supply: Balance,
    ) -> Option<Self> {
        let sum = balances
            .values()
            .try_fold(0u64, |acc, balance| acc.checked_add(*balance))?;
        if sum != total_supply {
            return None;
        }
        Some(Self { owner, balances, total_supply })
    }

    /// All non-zero balances.
    pub fn balances(&self) -> &BTreeMap<AccountId, Balance> {
        &self.balances
    }
}

impl Ledger for MemoryLedger {
    fn owner(&self) -> AccountId {
        self.owner
    }

    fn balance_of(&self, account: &AccountId) -> Balance {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn total_supply(&self) -> Balance {
        self.total_supply
    }

    fn mint(&mut self, account: &AccountId, amount: Balance, caller: &AccountId) -> Result<(), ContestError> {
        if *caller != self.owner {
            return Err(ContestError::Authorization { caller: *caller, action: "mint" });
        }

        // Balances never exceed the supply, so only the supply can overflow.
        let total_supply = self.total_supply.checked_add(amount).ok_or(ContestError::Value {
            value: amount,
            reason: "total supply overflow",
        })?;

        self.total_supply = total_supply;
        if amount > 0 {
            *self.balances.entry(*account).or_insert(0) += amount;
        }
        Ok(())
    }

    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: Balance) -> Result<(), ContestError> {
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(ContestError::InsufficientFunds {
                account: *from,
                balance,
                required: amount,
            });
        }
        if from == to || amount == 0 {
            return Ok(());
        }

        let remaining = balance - amount;
        if remaining == 0 {
            self.balances.remove(from);
        } else {
            self.balances.insert(*from, remaining);
        }
        *self.balances.entry(*to).or_insert(0) += amount;
        Ok(())
    }
}
