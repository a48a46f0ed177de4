//! Fingerprinting of rewriting systems.
//!
//! Deterministic hashing with domain separation and length prefixing, so
//! equal rule sets always give equal fingerprints and no two different rule
//! sets share an encoding.
//!
//! # Citations
//! - SHA-256: NIST FIPS 180-4 (2015)
//! - Domain separation & length prefixing: Bernstein et al., "How to hash into elliptic curves" (2009)

use crate::word::{word_to_bytes, Generator};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A 256-bit hash value.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashValue(pub [u8; 32]);

impl HashValue {
    /// Creates a zero hash (all zeros).
    #[inline]
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Creates a hash from a raw byte array.
    #[inline]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw byte array.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Computes SHA-256 of `data` with domain separation.
    ///
    /// Hashes `b"SWF:<domain>:v1" || le64(len(data)) || data`.
    pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"SWF:");
        hasher.update(domain);
        hasher.update(b":v1");
        hasher.update((data.len() as u64).to_le_bytes());
        hasher.update(data);
        Self(hasher.finalize().into())
    }
}

impl std::fmt::Display for HashValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // First 4 bytes are enough to tell runs apart in logs.
        write!(
            f,
            "HashValue({:02x}{:02x}{:02x}{:02x}…)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

/// Fingerprint of a rule set.
///
/// Rules are hashed in sorted order, each side length-prefixed, so the
/// result does not depend on insertion order.
pub fn rules_fingerprint<L, R>(rules: &[(L, R)]) -> HashValue
where
    L: AsRef<[Generator]>,
    R: AsRef<[Generator]>,
{
    let mut encoded: Vec<Vec<u8>> = rules
        .iter()
        .map(|(lhs, rhs)| {
            let mut bytes = Vec::new();
            for side in [lhs.as_ref(), rhs.as_ref()] {
                bytes.extend_from_slice(&(side.len() as u64).to_le_bytes());
                bytes.extend_from_slice(&word_to_bytes(side));
            }
            bytes
        })
        .collect();
    encoded.sort();
    let mut data = Vec::new();
    data.extend_from_slice(&(encoded.len() as u64).to_le_bytes());
    for rule in &encoded {
        data.extend_from_slice(rule);
    }
    HashValue::hash_with_domain(b"RULES", &data)
}
