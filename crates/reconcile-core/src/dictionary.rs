//! Chunk dictionary (§4.2, §3 Entity: Chunk Dictionary).
//!
//! An injective `u64 -> String` mapping with collision detection. Per the
//! design note in spec.md §9 ("Process-wide dictionary and shingle set"),
//! this is always constructed per-peer-per-string-reconciliation — never a
//! module-level global, which is exactly the bug the original carried (see
//! `examples/original_source/pkg/algorithms/dictionary.go`'s package-level
//! `var dict`).

use crate::error::{ReconcileError, Result};
use crate::hash::fnv64;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    entries: HashMap<u64, String>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, returning its hash. Idempotent for repeated identical
    /// entries; a hard `Collision` error if a different string already
    /// owns the same hash.
    pub fn add(&mut self, entry: &str) -> Result<u64> {
        if entry.is_empty() {
            return Err(ReconcileError::InvalidArgument(
                "dictionary entry must not be empty".to_string(),
            ));
        }
        let hash = fnv64(entry.as_bytes());
        match self.entries.get(&hash) {
            Some(existing) if existing != entry => Err(ReconcileError::Collision { hash }),
            Some(_) => Ok(hash),
            None => {
                self.entries.insert(hash, entry.to_string());
                Ok(hash)
            }
        }
    }

    pub fn lookup(&self, hash: u64) -> Result<&str> {
        match self.entries.get(&hash) {
            None => Err(ReconcileError::NotFound(format!(
                "hash {hash} not found in dictionary"
            ))),
            Some(s) if s.is_empty() => {
                Err(ReconcileError::NotFound(format!("hash {hash} maps to an empty entry")))
            }
            Some(s) => Ok(s.as_str()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent_for_same_entry() {
        let mut d = Dictionary::new();
        let h1 = d.add("chunk-a").unwrap();
        let h2 = d.add("chunk-a").unwrap();
        assert_eq!(h1, h2);
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn add_rejects_empty_entry() {
        let mut d = Dictionary::new();
        assert!(matches!(
            d.add("").unwrap_err(),
            ReconcileError::InvalidArgument(_)
        ));
    }

    #[test]
    fn lookup_returns_not_found_for_missing_hash() {
        let d = Dictionary::new();
        assert!(matches!(d.lookup(42).unwrap_err(), ReconcileError::NotFound(_)));
    }

    #[test]
    fn lookup_round_trips() {
        let mut d = Dictionary::new();
        let hash = d.add("hello").unwrap();
        assert_eq!(d.lookup(hash).unwrap(), "hello");
    }
}
