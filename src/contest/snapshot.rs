//! State Snapshots
//!
//! Persists ledger balances and lock generations so a host can restart
//! without forgetting who is locked. Format: one version byte followed by
//! the bincode-encoded [`Snapshot`].

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::debug;

use crate::core::account::{AccountId, Balance};
use super::engine::{ContestConfig, ContestEngine};
use super::events::NotificationSink;
use super::ledger::{Ledger, MemoryLedger};
use super::lock::LockRegistry;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u8 = 1;

/// Persisted engine state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Minting authority.
    pub owner: AccountId,
    /// Total supply.
    pub total_supply: Balance,
    /// Non-zero balances.
    pub balances: BTreeMap<AccountId, Balance>,
    /// Lock generations.
    pub lock_generations: BTreeMap<AccountId, u64>,
}

/// Errors reading or writing snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Filesystem error.
    #[error("snapshot io: {0}")]
    Io(#[from] io::Error),

    /// Encoding or decoding failed.
    #[error("snapshot encoding: {0}")]
    Encoding(#[from] bincode::Error),

    /// Unknown format version.
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u8),

    /// File was empty.
    #[error("snapshot is empty")]
    Empty,

    /// Balances do not add up to the total supply.
    #[error("snapshot balances do not match total supply {0}")]
    SupplyMismatch(Balance),

    /// Snapshot belongs to a different owner than configured.
    #[error("snapshot owner {found} does not match configured owner {expected}")]
    OwnerMismatch {
        /// Owner from configuration.
        expected: AccountId,
        /// Owner stored in the snapshot.
        found: AccountId,
    },
}

impl Snapshot {
    /// Capture the state of an engine backed by a [`MemoryLedger`].
    pub fn capture<S: NotificationSink>(engine: &ContestEngine<MemoryLedger, S>) -> Self {
        Self {
            owner: engine.owner(),
            total_supply: engine.total_supply(),
            balances: engine.ledger().balances().clone(),
            lock_generations: engine.locks().generations().clone(),
        }
    }

    /// Rebuild an engine from this snapshot.
    pub fn restore<S: NotificationSink>(
        self,
        config: ContestConfig,
        sink: S,
    ) -> Result<ContestEngine<MemoryLedger, S>, SnapshotError> {
        let total_supply = self.total_supply;
        let ledger = MemoryLedger::from_parts(self.owner, self.balances, total_supply)
            .ok_or(SnapshotError::SupplyMismatch(total_supply))?;
        let locks = LockRegistry::from_generations(self.lock_generations);
        debug!("Restored ledger with supply {}", ledger.total_supply());
        Ok(ContestEngine::with_locks(config, ledger, locks, sink))
    }

    /// Encode to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        let mut bytes = vec![SNAPSHOT_VERSION];
        bytes.extend(bincode::serialize(self)?);
        Ok(bytes)
    }

    /// Decode from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, SnapshotError> {
        let (version, body) = data.split_first().ok_or(SnapshotError::Empty)?;
        if *version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(*version));
        }
        Ok(bincode::deserialize(body)?)
    }

    /// Write to `path`, replacing any previous snapshot atomically.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let bytes = self.to_bytes()?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Read from `path`. Returns `None` if the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, SnapshotError> {
        match fs::read(path) {
            Ok(bytes) => Self::from_bytes(&bytes).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contest::engine::ContestRequest;
    use crate::core::signature::{sign_alpha, sign_beta, Keypair};

    fn engine_with_history() -> (ContestEngine, Keypair, Keypair) {
        let owner = Keypair::from_seed("Owner");
        let a = Keypair::from_seed("Alice");
        let b = Keypair::from_seed("Bob");
        let mut engine = ContestEngine::new(
            ContestConfig::default(),
            MemoryLedger::new(owner.account_id()),
            (),
        );
        engine.mint(&a.account_id(), 50, &owner.account_id()).unwrap();

        let alpha_signature = sign_alpha(&a, &b.account_id(), 10, 0, 100);
        let beta_signature = sign_beta(&b, &alpha_signature);
        let request = ContestRequest {
            from: a.account_id(),
            to: b.account_id(),
            value: 10,
            t0: 0,
            t1: 100,
            alpha_signature,
            beta_signature,
        };
        engine.contest(&b.account_id(), &request, 50).unwrap();
        (engine, a, b)
    }

    #[test]
    fn test_capture_and_restore() {
        let (engine, a, b) = engine_with_history();
        let snapshot = Snapshot::capture(&engine);

        let bytes = snapshot.to_bytes().unwrap();
        let restored = Snapshot::from_bytes(&bytes)
            .unwrap()
            .restore(ContestConfig::default(), ())
            .unwrap();

        assert_eq!(restored.balance_of(&a.account_id()), 40);
        assert_eq!(restored.balance_of(&b.account_id()), 10);
        assert_eq!(restored.total_supply(), 50);
        assert!(restored.is_locked(&a.account_id()));
        assert_eq!(restored.owner(), engine.owner());
    }

    #[test]
    fn test_rejects_unknown_version() {
        let (engine, _, _) = engine_with_history();
        let mut bytes = Snapshot::capture(&engine).to_bytes().unwrap();
        bytes[0] = 99;

        assert!(matches!(Snapshot::from_bytes(&bytes), Err(SnapshotError::UnsupportedVersion(99))));
        assert!(matches!(Snapshot::from_bytes(&[]), Err(SnapshotError::Empty)));
    }

    #[test]
    fn test_rejects_supply_mismatch() {
        let (engine, _, _) = engine_with_history();
        let mut snapshot = Snapshot::capture(&engine);
        snapshot.total_supply += 1;

        assert!(matches!(
            snapshot.restore(ContestConfig::default(), ()),
            Err(SnapshotError::SupplyMismatch(51))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");

        assert!(Snapshot::load(&path).unwrap().is_none());

        let (engine, _, _) = engine_with_history();
        let snapshot = Snapshot::capture(&engine);
        snapshot.save(&path).unwrap();

        assert_eq!(Snapshot::load(&path).unwrap(), Some(snapshot));
    }
}
