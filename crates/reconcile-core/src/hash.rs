//! Keyed hashes and digest helpers.
//!
//! `fnv64` backs the per-element hashes used by the `Set` digest (§4.1) and
//! by the RCDS chunk dictionary (§4.2). `crypto_digest` backs IBLT hash-sync
//! mode, where elements are reduced to a fixed-width digest before insertion
//! (§4.8, §6 option descriptor `hashFunc`).

use fnv::FnvHasher;
use sha1::Sha1;
use sha2::{Digest as _, Sha256, Sha512};
use std::hash::Hasher as _;

/// FNV-64 hash of a byte slice, matching Go's `hash/fnv` 64-bit hash used
/// throughout the original implementation.
pub fn fnv64(bytes: &[u8]) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(bytes);
    hasher.finish()
}

/// XOR-fold a sequence of per-element FNV-64 hashes into a single set
/// digest. Order-independent by construction (§3 Digest invariant).
pub fn xor_fold<'a, I: IntoIterator<Item = &'a [u8]>>(elements: I) -> u64 {
    elements.into_iter().fold(0u64, |acc, e| acc ^ fnv64(e))
}

/// Cryptographic digest kinds available for IBLT hash-sync mode (§6 option
/// descriptor `hashFunc`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestKind {
    Sha1,
    Sha256,
    Sha512,
}

impl DigestKind {
    /// Fixed output width in bytes — used as the IBLT element width `w`
    /// when hash-sync is enabled (§4.8).
    pub fn size(self) -> usize {
        match self {
            DigestKind::Sha1 => 20,
            DigestKind::Sha256 => 32,
            DigestKind::Sha512 => 64,
        }
    }
}

/// Compute a fixed-width cryptographic digest of `bytes` using `kind`.
pub fn crypto_digest(bytes: &[u8], kind: DigestKind) -> Vec<u8> {
    match kind {
        DigestKind::Sha1 => Sha1::digest(bytes).to_vec(),
        DigestKind::Sha256 => Sha256::digest(bytes).to_vec(),
        DigestKind::Sha512 => Sha512::digest(bytes).to_vec(),
    }
}
