//! The IBLT itself: `m` cells touched by `k` independent hashes per
//! element, plus the peeling decode that recovers the elements unique to
//! each side of a `subtract`.

use crate::cell::Cell;
use reconcile_core::error::{ReconcileError, Result};
use reconcile_core::hash::fnv64;

/// Golden-ratio-derived odd constant used to decorrelate the `k` cell-index
/// hashes from a single `fnv64` digest, rather than requiring `k` literally
/// distinct hash functions (§4.8).
pub(crate) const GOLDEN_RATIO_CONSTANT: u64 = 0x9e3779b97f4a7c15;

#[derive(Debug, Clone)]
pub struct Table {
    cells: Vec<Cell>,
    m: usize,
    k: usize,
    w: usize,
    v: usize,
}

/// The result of decoding a subtracted table: elements present only on the
/// side that was subtracted *from* (`alpha`) and only on the side that was
/// subtracted (`beta`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub alpha: Vec<Vec<u8>>,
    pub beta: Vec<Vec<u8>>,
}

/// `m = ceil(symmetric_diff * table_size_constant).max(4)`,
/// `k = max(2, log10(m).floor())` (§4.8; matches the Go default of
/// `tableSize := 2*diffNum + diffNum/2` when `table_size_constant == 2.5`).
pub fn table_size_for(symmetric_diff: usize, table_size_constant: f64) -> (usize, usize) {
    let m = ((symmetric_diff as f64) * table_size_constant).ceil() as usize;
    let m = m.max(4);
    let k = ((m as f64).log10().floor() as usize).max(2);
    (m, k)
}

impl Table {
    pub fn new(m: usize, k: usize, w: usize, v: usize) -> Self {
        Self {
            cells: vec![Cell::empty(w, v); m],
            m,
            k,
            v,
            w,
        }
    }

    pub fn m(&self) -> usize {
        self.m
    }

    pub fn k(&self) -> usize {
        self.k
    }

    fn indices(&self, key: &[u8]) -> Vec<usize> {
        let base = fnv64(key);
        let mut out = Vec::with_capacity(self.k);
        for i in 0..self.k {
            let h = base ^ (i as u64).wrapping_mul(GOLDEN_RATIO_CONSTANT);
            out.push((h % self.m as u64) as usize);
        }
        out
    }

    fn fit(&self, key: &[u8], value: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
        if key.len() > self.w {
            return Err(ReconcileError::OutOfRange {
                value: key.len() as i64,
                min: 0,
                max: self.w as i64,
            });
        }
        if value.len() > self.v {
            return Err(ReconcileError::OutOfRange {
                value: value.len() as i64,
                min: 0,
                max: self.v as i64,
            });
        }
        let mut k = vec![0u8; self.w];
        k[..key.len()].copy_from_slice(key);
        let mut v = vec![0u8; self.v];
        v[..value.len()].copy_from_slice(value);
        Ok((k, v))
    }

    pub fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.apply(key, value, 1)
    }

    pub fn delete(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.apply(key, value, -1)
    }

    fn apply(&mut self, key: &[u8], value: &[u8], delta: i32) -> Result<()> {
        let (key, value) = self.fit(key, value)?;
        for idx in self.indices(&key) {
            self.cells[idx].apply(&key, &value, delta);
        }
        Ok(())
    }

    /// Cell-wise subtraction: `self -= other`. Both tables must share the
    /// same dimensions — they were built with the same `m`/`k`/`w`/`v`.
    pub fn subtract(&mut self, other: &Table) -> Result<()> {
        if self.m != other.m || self.k != other.k || self.w != other.w || self.v != other.v {
            return Err(ReconcileError::DecodeParameterMismatch(format!(
                "table dimensions differ: ({}, {}, {}, {}) vs ({}, {}, {}, {})",
                self.m, self.k, self.w, self.v, other.m, other.k, other.w, other.v
            )));
        }
        for (a, b) in self.cells.iter_mut().zip(other.cells.iter()) {
            a.subtract(b);
        }
        Ok(())
    }

    /// Peel pure cells until none remain. A non-empty, non-pure cell left
    /// behind means the table was too small for the actual symmetric
    /// difference — the caller should retry with a larger table
    /// (§4.8 retry escalation).
    pub fn decode(mut self) -> Result<Diff> {
        let mut diff = Diff::default();
        loop {
            let pure_idx = self.cells.iter().position(|c| !c.is_empty() && c.is_pure());
            let Some(idx) = pure_idx else { break };

            let key = self.cells[idx].key_sum.clone();
            let value = self.cells[idx].value_sum.clone();
            let count = self.cells[idx].count;

            for target in self.indices(&key) {
                self.cells[target].apply(&key, &value, -count);
            }

            if count > 0 {
                diff.alpha.push(key);
            } else {
                diff.beta.push(key);
            }
        }

        if self.cells.iter().any(|c| !c.is_empty()) {
            return Err(ReconcileError::DecodeFailed);
        }

        Ok(diff)
    }

    /// Fixed little-endian layout: `m, k, w, v` as `u32` header, then `m`
    /// cells of `count:i32, key_sum:w bytes, value_sum:v bytes,
    /// hash_check:w bytes` (§6; `hash_check` is `w`-wide, parallel to
    /// `key_sum`, not a fixed 8 bytes).
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + self.m * (4 + self.w + self.v + self.w));
        out.extend_from_slice(&(self.m as u32).to_le_bytes());
        out.extend_from_slice(&(self.k as u32).to_le_bytes());
        out.extend_from_slice(&(self.w as u32).to_le_bytes());
        out.extend_from_slice(&(self.v as u32).to_le_bytes());
        for cell in &self.cells {
            out.extend_from_slice(&cell.count.to_le_bytes());
            out.extend_from_slice(&cell.key_sum);
            out.extend_from_slice(&cell.value_sum);
            out.extend_from_slice(&cell.hash_check);
        }
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 16 {
            return Err(ReconcileError::Serialization(
                "table header truncated".to_string(),
            ));
        }
        let m = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
        let k = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
        let w = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
        let v = u32::from_le_bytes(bytes[12..16].try_into().unwrap()) as usize;

        let cell_len = 4 + w + v + w;
        let expected = 16 + m * cell_len;
        if bytes.len() != expected {
            return Err(ReconcileError::Serialization(format!(
                "expected {expected} bytes, found {}",
                bytes.len()
            )));
        }

        let mut cells = Vec::with_capacity(m);
        let mut offset = 16;
        for _ in 0..m {
            let count = i32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap());
            offset += 4;
            let key_sum = bytes[offset..offset + w].to_vec();
            offset += w;
            let value_sum = bytes[offset..offset + v].to_vec();
            offset += v;
            let hash_check = bytes[offset..offset + w].to_vec();
            offset += w;
            cells.push(Cell {
                count,
                key_sum,
                value_sum,
                hash_check,
            });
        }

        Ok(Self { cells, m, k, w, v })
    }
}
