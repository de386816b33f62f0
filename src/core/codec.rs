//! Commitment Encoding
//!
//! Canonical digests for the two commitments of a contest:
//!
//! ```text
//! alpha = SHA256("PBT_ALPHA_V1" || from || to || value || t0 || t1)
//! beta  = SHA256("PBT_BETA_V1"  || len(alpha_sig) || alpha_sig)
//! ```
//!
//! Beta has no fields of its own. It commits to the alpha signature bytes,
//! which only `from` can produce and only for one exact alpha tuple.

use serde::{Serialize, Deserialize};

use super::account::{AccountId, Balance, Timestamp};
use super::hash::{MessageDigest, MessageHasher};
use super::signature::Signature;

/// The proposer's transfer terms.
///
/// `from` offers `value` to `to`, valid only while `t0 <= now <= t1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlphaCommitment {
    /// Proposing (paying) account.
    pub from: AccountId,
    /// Receiving account.
    pub to: AccountId,
    /// Amount to transfer.
    pub value: Balance,
    /// Start of the validity window (inclusive).
    pub t0: Timestamp,
    /// End of the validity window (inclusive).
    pub t1: Timestamp,
}

impl AlphaCommitment {
    /// Create a new alpha commitment.
    pub fn new(from: AccountId, to: AccountId, value: Balance, t0: Timestamp, t1: Timestamp) -> Self {
        Self { from, to, value, t0, t1 }
    }

    /// Canonical digest signed by `from`.
    pub fn encode(&self) -> MessageDigest {
        let mut hasher = MessageHasher::for_alpha();
        hasher.update_bytes(self.from.as_bytes());
        hasher.update_bytes(self.to.as_bytes());
        hasher.update_u64(self.value);
        hasher.update_u64(self.t0);
        hasher.update_u64(self.t1);
        hasher.finalize()
    }
}

/// The counterparty's acknowledgment of one specific alpha signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BetaCommitment<'a> {
    /// Alpha signature being countersigned.
    pub alpha_signature: &'a Signature,
}

impl<'a> BetaCommitment<'a> {
    /// Wrap an alpha signature.
    pub fn new(alpha_signature: &'a Signature) -> Self {
        Self { alpha_signature }
    }

    /// Canonical digest signed by `to`.
    pub fn encode(&self) -> MessageDigest {
        let mut hasher = MessageHasher::for_beta();
        hasher.update_prefixed(self.alpha_signature.as_bytes());
        hasher.finalize()
    }
}

/// Encode alpha terms.
pub fn encode_alpha(
    from: &AccountId,
    to: &AccountId,
    value: Balance,
    t0: Timestamp,
    t1: Timestamp,
) -> MessageDigest {
    AlphaCommitment::new(*from, *to, value, t0, t1).encode()
}

/// Encode a beta commitment over an alpha signature.
pub fn encode_beta(alpha_signature: &Signature) -> MessageDigest {
    BetaCommitment::new(alpha_signature).encode()
}
