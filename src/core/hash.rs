//! Message Hashing
//!
//! Domain-separated SHA-256 used to build every canonical digest:
//! - Alpha/beta commitment encodings
//! - Account id derivation from public keys
//!
//! All integers are written big-endian with a fixed width, so a digest
//! computed by a signing client matches the one recomputed by the verifier.

use sha2::{Sha256, Digest};

/// Digest output type (256 bits / 32 bytes)
pub type MessageDigest = [u8; 32];

/// Domain tag for alpha commitments.
pub const ALPHA_DOMAIN: &[u8] = b"PBT_ALPHA_V1";

/// Domain tag for beta commitments.
pub const BETA_DOMAIN: &[u8] = b"PBT_BETA_V1";

/// Domain tag for account id derivation.
pub const ACCOUNT_DOMAIN: &[u8] = b"PBT_ACCOUNT_V1";

/// Incremental hasher with a leading domain separator.
///
/// Order of updates is part of the encoding.
pub struct MessageHasher {
    hasher: Sha256,
}

impl MessageHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for alpha commitments.
    pub fn for_alpha() -> Self {
        Self::new(ALPHA_DOMAIN)
    }

    /// Create hasher for beta commitments.
    pub fn for_beta() -> Self {
        Self::new(BETA_DOMAIN)
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with length-prefixed bytes (u32 big-endian length).
    #[inline]
    pub fn update_prefixed(&mut self, bytes: &[u8]) {
        self.update_u32(bytes.len() as u32);
        self.hasher.update(bytes);
    }

    /// Update with a u32 value (big-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_be_bytes());
    }

    /// Update with a u64 value (big-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_be_bytes());
    }

    /// Finalize and return the digest.
    pub fn finalize(self) -> MessageDigest {
        self.hasher.finalize().into()
    }
}

/// Compute hash with domain separator.
pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> MessageDigest {
    let mut hasher = MessageHasher::new(domain);
    hasher.update_bytes(data);
    hasher.finalize()
}
