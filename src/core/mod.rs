//! Core primitives.
//!
//! Pure, deterministic building blocks shared by signers and verifiers:
//! account ids, canonical commitment encodings and signature recovery.

pub mod account;
pub mod hash;
pub mod codec;
pub mod signature;

// Re-export core types
pub use account::{AccountId, AccountIdError, Balance, Timestamp};
pub use hash::{MessageDigest, MessageHasher};
pub use codec::{AlphaCommitment, BetaCommitment, encode_alpha, encode_beta};
pub use signature::{
    Keypair, Signature, recover, verify, verify_alpha, verify_beta, sign_alpha, sign_beta,
};
