//! A single IBLT bucket: an XOR-accumulated key, an XOR-accumulated value,
//! a signed count, and a hash checksum used to recognize when a cell holds
//! exactly one element (a "pure" cell, §4.8).

use crate::table::GOLDEN_RATIO_CONSTANT;
use reconcile_core::hash::fnv64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub count: i32,
    pub key_sum: Vec<u8>,
    pub value_sum: Vec<u8>,
    /// Same width as `key_sum` (`w`), not a fixed 8 bytes — hash-sync mode
    /// runs with `w` as wide as the configured digest (e.g. 32 for
    /// SHA-256), and this checksum has to cover the whole key (§3, §4.8).
    pub hash_check: Vec<u8>,
}

impl Cell {
    pub fn empty(w: usize, v: usize) -> Self {
        Self {
            count: 0,
            key_sum: vec![0u8; w],
            value_sum: vec![0u8; v],
            hash_check: vec![0u8; w],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0 && self.key_sum.iter().all(|&b| b == 0) && self.value_sum.iter().all(|&b| b == 0)
    }

    /// A cell is pure when its count is ±1 and its checksum confirms the
    /// accumulated key really is a single element, not an XOR collision of
    /// several.
    pub fn is_pure(&self) -> bool {
        (self.count == 1 || self.count == -1)
            && width_hash(&self.key_sum, self.hash_check.len()) == self.hash_check
    }

    pub fn apply(&mut self, key: &[u8], value: &[u8], delta: i32) {
        xor_into(&mut self.key_sum, key);
        xor_into(&mut self.value_sum, value);
        let check_width = self.hash_check.len();
        xor_into(&mut self.hash_check, &width_hash(key, check_width));
        self.count += delta;
    }

    /// In-place cell-wise subtraction used by `Table::subtract`.
    pub fn subtract(&mut self, other: &Cell) {
        xor_into(&mut self.key_sum, &other.key_sum);
        xor_into(&mut self.value_sum, &other.value_sum);
        xor_into(&mut self.hash_check, &other.hash_check);
        self.count -= other.count;
    }
}

fn xor_into(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d ^= s;
    }
}

/// A `width`-byte checksum of `key`, built by chaining `fnv64` over
/// successive golden-ratio-salted blocks — the same decorrelation trick
/// `Table::indices` uses to spread `k` cell indices from one hash.
fn width_hash(key: &[u8], width: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(width);
    let mut block = 0u64;
    while out.len() < width {
        let salted = fnv64(key) ^ block.wrapping_mul(GOLDEN_RATIO_CONSTANT);
        out.extend_from_slice(&salted.to_le_bytes());
        block += 1;
    }
    out.truncate(width);
    out
}
