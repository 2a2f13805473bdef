//! The reconciliation `Set` (§3 Entity: Set, §4.3).
//!
//! A single-owner mapping from element key to literal value. No internal
//! locking — §5 forbids concurrent mutation of a peer's set during a
//! session, and `&mut self` mutators make that the caller's problem to avoid
//! at compile time rather than at runtime.

use crate::element::ElementKey;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ReconSet {
    entries: HashMap<ElementKey, Vec<u8>>,
}

impl ReconSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key whose literal is its own bytes (the common case —
    /// FULL sync and non-hash-sync IBLT).
    pub fn insert_key(&mut self, key: ElementKey) {
        let bytes = key.as_bytes().to_vec();
        self.entries.insert(key, bytes);
    }

    /// Insert a key with a separate literal payload (hash-sync IBLT and
    /// RCDS, where the key is a digest and the literal is the original
    /// content).
    pub fn insert(&mut self, key: ElementKey, literal: Vec<u8>) {
        self.entries.insert(key, literal);
    }

    pub fn remove(&mut self, key: &ElementKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn has(&self, key: &ElementKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn literal(&self, key: &ElementKey) -> Option<&[u8]> {
        self.entries.get(key).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ElementKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ElementKey, &Vec<u8>)> {
        self.entries.iter()
    }

    pub fn difference(&self, other: &ReconSet) -> ReconSet {
        let mut out = ReconSet::new();
        for (k, v) in &self.entries {
            if !other.entries.contains_key(k) {
                out.entries.insert(k.clone(), v.clone());
            }
        }
        out
    }

    pub fn intersection(&self, other: &ReconSet) -> ReconSet {
        let mut out = ReconSet::new();
        for (k, v) in &self.entries {
            if other.entries.contains_key(k) {
                out.entries.insert(k.clone(), v.clone());
            }
        }
        out
    }

    pub fn union(&self, other: &ReconSet) -> ReconSet {
        let mut out = self.clone();
        for (k, v) in &other.entries {
            out.entries.entry(k.clone()).or_insert_with(|| v.clone());
        }
        out
    }

    /// 64-bit order-independent digest: XOR-fold of FNV-64 over each
    /// element key's canonical bytes (§3 Entity: Digest).
    pub fn digest(&self) -> u64 {
        crate::hash::xor_fold(self.entries.keys().map(|k| k.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let mut s = ReconSet::new();
        s.insert_key(ElementKey::from_str("a"));
        let len_before = s.len();
        s.insert_key(ElementKey::from_str("a"));
        assert_eq!(s.len(), len_before);
    }

    #[test]
    fn digest_unchanged_after_insert_remove() {
        let mut s = ReconSet::new();
        s.insert_key(ElementKey::from_str("a"));
        let d0 = s.digest();
        s.insert_key(ElementKey::from_str("b"));
        s.remove(&ElementKey::from_str("b"));
        assert_eq!(s.digest(), d0);
    }

    #[test]
    fn digest_is_order_independent() {
        let mut a = ReconSet::new();
        a.insert_key(ElementKey::from_str("x"));
        a.insert_key(ElementKey::from_str("y"));

        let mut b = ReconSet::new();
        b.insert_key(ElementKey::from_str("y"));
        b.insert_key(ElementKey::from_str("x"));

        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn difference_union_intersection() {
        let mut a = ReconSet::new();
        a.insert_key(ElementKey::from_str("a"));
        a.insert_key(ElementKey::from_str("b"));

        let mut b = ReconSet::new();
        b.insert_key(ElementKey::from_str("b"));
        b.insert_key(ElementKey::from_str("c"));

        assert_eq!(a.difference(&b).len(), 1);
        assert_eq!(a.intersection(&b).len(), 1);
        assert_eq!(a.union(&b).len(), 3);
    }
}
