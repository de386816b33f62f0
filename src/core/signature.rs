//! Signatures and Signer Recovery
//!
//! A signature is an envelope of the signer's ed25519 public key followed by
//! the ed25519 signature (96 bytes total). Recovery checks the signature
//! against the embedded key and derives the signer's [`AccountId`] from it.
//!
//! Verification never errors. Malformed envelopes, invalid points and
//! mismatching signers all produce the same `false`.

use std::fmt;

use ed25519_dalek::{Signature as Ed25519Signature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Serialize, Deserialize};

use super::account::{AccountId, Balance, Timestamp};
use super::codec::{encode_alpha, encode_beta};
use super::hash::hash_with_domain;

/// Length of an ed25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Length of a well-formed signature envelope.
pub const SIGNATURE_LEN: usize = PUBLIC_KEY_LEN + 64;

/// Domain tag for deriving keys from seed strings.
const KEY_SEED_DOMAIN: &[u8] = b"PBT_KEY_SEED_V1";

/// Signature envelope bytes.
///
/// May hold arbitrary bytes; only verification decides whether they are
/// well-formed. Serialized as a hex string.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Signature(Vec<u8>);

impl Signature {
    /// Wrap raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Parse from hex (optional `0x` prefix).
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        hex::decode(trimmed).map(Self)
    }

    /// Encode as `0x`-prefixed hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }

    fn from_parts(public_key: &[u8; PUBLIC_KEY_LEN], signature: &Ed25519Signature) -> Self {
        let mut bytes = Vec::with_capacity(SIGNATURE_LEN);
        bytes.extend_from_slice(public_key);
        bytes.extend_from_slice(&signature.to_bytes());
        Self(bytes)
    }
}

impl TryFrom<String> for Signature {
    type Error = hex::FromHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Signature> for String {
    fn from(sig: Signature) -> Self {
        sig.to_hex()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_hex())
    }
}

/// Recover the account that signed `message`.
///
/// Returns `None` for anything that is not a valid signature over `message`.
pub fn recover(message: &[u8], signature: &Signature) -> Option<AccountId> {
    let bytes = signature.as_bytes();
    if bytes.len() != SIGNATURE_LEN {
        return None;
    }

    let mut public_key = [0u8; PUBLIC_KEY_LEN];
    public_key.copy_from_slice(&bytes[..PUBLIC_KEY_LEN]);
    let mut sig_bytes = [0u8; 64];
    sig_bytes.copy_from_slice(&bytes[PUBLIC_KEY_LEN..]);

    let verifying_key = VerifyingKey::from_bytes(&public_key).ok()?;
    let sig = Ed25519Signature::from_bytes(&sig_bytes);
    verifying_key.verify_strict(message, &sig).ok()?;

    Some(AccountId::from_public_key(&public_key))
}

/// Check that `claimed_signer` signed `message`.
pub fn verify(message: &[u8], claimed_signer: &AccountId, signature: &Signature) -> bool {
    recover(message, signature).map_or(false, |signer| signer == *claimed_signer)
}

/// Check an alpha signature against the terms it should cover.
pub fn verify_alpha(
    from: &AccountId,
    to: &AccountId,
    value: Balance,
    t0: Timestamp,
    t1: Timestamp,
    signer: &AccountId,
    signature: &Signature,
) -> bool {
    let message = encode_alpha(from, to, value, t0, t1);
    verify(&message, signer, signature)
}

/// Check a beta signature against the alpha signature it should cover.
pub fn verify_beta(alpha_signature: &Signature, signer: &AccountId, signature: &Signature) -> bool {
    let message = encode_beta(alpha_signature);
    verify(&message, signer, signature)
}

// =============================================================================
// CLIENT-SIDE SIGNING
// =============================================================================

/// An ed25519 signing key and the account it controls.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
    account_id: AccountId,
}

impl Keypair {
    /// Generate a fresh keypair from OS randomness.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Derive a keypair deterministically from a seed string.
    ///
    /// Convenient for fixtures and local development accounts.
    pub fn from_seed(seed: &str) -> Self {
        let secret = hash_with_domain(KEY_SEED_DOMAIN, seed.as_bytes());
        Self::from_secret_bytes(&secret)
    }

    /// Build from a 32-byte secret key.
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(secret))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let account_id = AccountId::from_public_key(&signing_key.verifying_key().to_bytes());
        Self { signing_key, account_id }
    }

    /// Account controlled by this key.
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// Raw public key bytes.
    pub fn public_key(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Sign a message, producing a recoverable envelope.
    pub fn sign(&self, message: &[u8]) -> Signature {
        let sig = self.signing_key.sign(message);
        Signature::from_parts(&self.public_key(), &sig)
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

/// Sign alpha terms as the proposer (`from` is the keypair's account).
pub fn sign_alpha(
    proposer: &Keypair,
    to: &AccountId,
    value: Balance,
    t0: Timestamp,
    t1: Timestamp,
) -> Signature {
    let message = encode_alpha(&proposer.account_id(), to, value, t0, t1);
    proposer.sign(&message)
}

/// Countersign an alpha signature as the recipient.
pub fn sign_beta(recipient: &Keypair, alpha_signature: &Signature) -> Signature {
    let message = encode_beta(alpha_signature);
    recipient.sign(&message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn alice() -> Keypair {
        Keypair::from_seed("Alice")
    }

    fn bob() -> Keypair {
        Keypair::from_seed("Bob")
    }

    #[test]
    fn test_verify_alpha_positive() {
        let (a, b) = (alice(), bob());
        let alpha = sign_alpha(&a, &b.account_id(), 10, 0, 2);

        assert!(verify_alpha(&a.account_id(), &b.account_id(), 10, 0, 2, &a.account_id(), &alpha));
    }

    #[test]
    fn test_verify_alpha_negative_window() {
        let (a, b) = (alice(), bob());
        let alpha = sign_alpha(&a, &b.account_id(), 10, 0, 2);

        assert!(!verify_alpha(&a.account_id(), &b.account_id(), 10, 1, 2, &a.account_id(), &alpha));
    }

    #[test]
    fn test_verify_alpha_wrong_signer() {
        let (a, b) = (alice(), bob());
        let alpha = sign_alpha(&a, &b.account_id(), 10, 0, 2);

        assert!(!verify_alpha(&a.account_id(), &b.account_id(), 10, 0, 2, &b.account_id(), &alpha));
    }

    #[test]
    fn test_verify_beta_positive() {
        let (a, b) = (alice(), bob());
        let alpha = sign_alpha(&a, &b.account_id(), 10, 0, 2);
        let beta = sign_beta(&b, &alpha);

        assert!(verify_beta(&alpha, &b.account_id(), &beta));
    }

    #[test]
    fn test_verify_beta_bound_to_alpha_instance() {
        let (a, b) = (alice(), bob());
        let alpha10 = sign_alpha(&a, &b.account_id(), 10, 0, 2);
        let alpha11 = sign_alpha(&a, &b.account_id(), 11, 0, 2);
        let beta11 = sign_beta(&b, &alpha11);

        assert!(!verify_beta(&alpha10, &b.account_id(), &beta11));
    }

    #[test]
    fn test_recover_returns_signer() {
        let a = alice();
        let sig = a.sign(b"message");

        assert_eq!(recover(b"message", &sig), Some(a.account_id()));
        assert_eq!(recover(b"other", &sig), None);
    }

    #[test]
    fn test_malformed_signatures_are_plain_false() {
        let a = alice();
        let message = [7u8; 32];
        let good = a.sign(&message);
        let mut extended = good.as_bytes().to_vec();
        extended.push(0);

        let cases = vec![
            Signature::default(),
            Signature::from_bytes(vec![0; 10]),
            Signature::from_bytes(vec![0xFF; SIGNATURE_LEN]),
            Signature::from_bytes(good.as_bytes()[..SIGNATURE_LEN - 1].to_vec()),
            Signature::from_bytes(extended),
        ];

        for sig in cases {
            assert!(!verify(&message, &a.account_id(), &sig));
        }
    }

    #[test]
    fn test_swapped_public_key_fails() {
        let (a, b) = (alice(), bob());
        let message = [9u8; 32];
        let sig = a.sign(&message);

        // Claim Bob's key with Alice's signature bytes.
        let mut forged = b.public_key().to_vec();
        forged.extend_from_slice(&sig.as_bytes()[PUBLIC_KEY_LEN..]);

        assert!(!verify(&message, &b.account_id(), &Signature::from_bytes(forged)));
    }

    #[test]
    fn test_seeded_keys_are_stable() {
        assert_eq!(alice().account_id(), Keypair::from_seed("Alice").account_id());
        assert_ne!(alice().account_id(), bob().account_id());
        assert_ne!(Keypair::generate().account_id(), Keypair::generate().account_id());
    }

    #[test]
    fn test_signature_hex_roundtrip() {
        let sig = alice().sign(b"hex");
        let json = serde_json::to_string(&sig).unwrap();
        let parsed: Signature = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, sig);
        assert_eq!(Signature::from_hex(&sig.to_hex()[2..]).unwrap(), sig);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn alpha_alteration_breaks_verification(
            value in 1u64..1_000_000,
            t0 in 0u64..1_000_000,
            span in 0u64..10_000,
            field in 0usize..4,
        ) {
            let (a, b) = (alice(), bob());
            let t1 = t0 + span;
            let alpha = sign_alpha(&a, &b.account_id(), value, t0, t1);
            let (from, to) = (a.account_id(), b.account_id());

            prop_assert!(verify_alpha(&from, &to, value, t0, t1, &from, &alpha));

            let altered = match field {
                0 => verify_alpha(&from, &from, value, t0, t1, &from, &alpha),
                1 => verify_alpha(&from, &to, value + 1, t0, t1, &from, &alpha),
                2 => verify_alpha(&from, &to, value, t0 + 1, t1, &from, &alpha),
                _ => verify_alpha(&from, &to, value, t0, t1 + 1, &from, &alpha),
            };
            prop_assert!(!altered);
        }

        #[test]
        fn garbage_never_verifies(bytes in proptest::collection::vec(any::<u8>(), 0..200)) {
            let a = alice();
            prop_assert!(!verify(b"payload", &a.account_id(), &Signature::from_bytes(bytes)));
        }
    }
}
