//! Account Identifiers
//!
//! Accounts are named by a 20-byte id derived from an ed25519 public key.
//! Uses `Ord` so ledger maps iterate deterministically.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use super::hash::{hash_with_domain, ACCOUNT_DOMAIN};

/// Token amount.
pub type Balance = u64;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Length of an account id in bytes.
pub const ACCOUNT_ID_LEN: usize = 20;

/// Account identifier.
///
/// Serialized as a `0x`-prefixed hex string.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(pub [u8; ACCOUNT_ID_LEN]);

impl AccountId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; ACCOUNT_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive the account id owned by an ed25519 public key.
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        let hash = hash_with_domain(ACCOUNT_DOMAIN, public_key);
        let mut id = [0u8; ACCOUNT_ID_LEN];
        id.copy_from_slice(&hash[..ACCOUNT_ID_LEN]);
        Self(id)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; ACCOUNT_ID_LEN] {
        &self.0
    }

    /// Short hex prefix for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

/// Errors from parsing an account id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountIdError {
    /// Not valid hex.
    #[error("account id is not valid hex")]
    InvalidHex,
    /// Wrong number of bytes.
    #[error("account id must be 20 bytes, got {0}")]
    InvalidLength(usize),
}

impl FromStr for AccountId {
    type Err = AccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(trimmed).map_err(|_| AccountIdError::InvalidHex)?;
        if bytes.len() != ACCOUNT_ID_LEN {
            return Err(AccountIdError::InvalidLength(bytes.len()));
        }
        let mut id = [0u8; ACCOUNT_ID_LEN];
        id.copy_from_slice(&bytes);
        Ok(Self(id))
    }
}

impl TryFrom<String> for AccountId {
    type Error = AccountIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let id = AccountId::new([0xAB; ACCOUNT_ID_LEN]);
        let text = id.to_string();

        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 2 + 2 * ACCOUNT_ID_LEN);
        assert_eq!(text.parse::<AccountId>().unwrap(), id);
        assert_eq!(text[2..].parse::<AccountId>().unwrap(), id);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!("0xzz".parse::<AccountId>(), Err(AccountIdError::InvalidHex));
        assert_eq!("0x0102".parse::<AccountId>(), Err(AccountIdError::InvalidLength(2)));
    }

    #[test]
    fn test_public_key_derivation() {
        let id1 = AccountId::from_public_key(&[1; 32]);
        let id2 = AccountId::from_public_key(&[1; 32]);
        let id3 = AccountId::from_public_key(&[2; 32]);

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_json_is_hex_string() {
        let id = AccountId::new([0x01; ACCOUNT_ID_LEN]);
        let json = serde_json::to_string(&id).unwrap();

        assert_eq!(json, format!("\"{}\"", id));
        assert_eq!(serde_json::from_str::<AccountId>(&json).unwrap(), id);
        assert!(serde_json::from_str::<AccountId>("\"0x01\"").is_err());
    }
}
