//! Content-defined chunking by local-minimum rolling hash (§4.5).
//!
//! Operates on the byte representation of the input string — chunk
//! boundaries are content hash minima, not character boundaries, so a
//! chunk is only guaranteed to be a valid UTF-8 string when the input is
//! ASCII. Non-ASCII boundaries are reassembled with `from_utf8_lossy`,
//! matching the original's treatment of strings as plain byte slices.

use reconcile_core::error::{ReconcileError, Result};
use reconcile_core::hash::fnv64;
use std::collections::BTreeMap;

/// Sliding window of the last `2h` rolling-hash values, ordered so the
/// minimum is found in O(log n) instead of an O(h) linear scan. A
/// `BTreeSet` can't represent this because rolling hashes collide; the
/// `usize` here is a per-key occurrence count (a counted multiset).
#[derive(Debug, Default)]
struct HashWindow {
    counts: BTreeMap<u64, usize>,
}

impl HashWindow {
    fn insert(&mut self, value: u64) {
        *self.counts.entry(value).or_insert(0) += 1;
    }

    fn remove(&mut self, value: u64) {
        if let Some(count) = self.counts.get_mut(&value) {
            *count -= 1;
            if *count == 0 {
                self.counts.remove(&value);
            }
        }
    }

    fn min(&self) -> Option<u64> {
        self.counts.keys().next().copied()
    }
}

/// Rolling content hashes: `fnv64` of each `r`-byte window, folded into
/// `[0, hash_space)`.
fn rolling_hashes(bytes: &[u8], r: usize, hash_space: u64) -> Result<Vec<u64>> {
    if r < 1 {
        return Err(ReconcileError::InvalidArgument(
            "rolling window size must be at least 1".to_string(),
        ));
    }
    if bytes.len() < r {
        return Err(ReconcileError::InvalidArgument(
            "rolling window size is bigger than the input".to_string(),
        ));
    }
    let hash_space = hash_space.max(1);
    Ok((0..=bytes.len() - r)
        .map(|i| fnv64(&bytes[i..i + r]) % hash_space)
        .collect())
}

/// Partition `s` into content-defined chunks. `h` is the local-minimum
/// look-ahead/look-behind distance, `r` the rolling window width, `hs`
/// the hash space the rolling hash is folded into.
///
/// Inputs shorter than `2*h + r` are returned as a single chunk.
pub fn content_dependent_chunking(
    s: &str,
    h: usize,
    r: usize,
    hs: u64,
) -> Result<Vec<String>> {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return Err(ReconcileError::InvalidArgument(
            "empty input string".to_string(),
        ));
    }
    if bytes.len() < 2 * h + r {
        return Ok(vec![s.to_string()]);
    }

    let hashes = rolling_hashes(bytes, r, hs)?;

    let mut window = HashWindow::default();
    for &value in &hashes[..2 * h] {
        window.insert(value);
    }

    let mut chunks = Vec::new();
    let mut par_idx = 0usize;

    for i in h..hashes.len() - h {
        window.insert(hashes[i + h]);

        if i - par_idx > h && window.min() == Some(hashes[i]) {
            chunks.push(to_chunk(&bytes[par_idx..i]));
            par_idx = i;
        }

        window.remove(hashes[i - h]);
    }

    chunks.push(to_chunk(&bytes[par_idx..]));
    Ok(chunks)
}

fn to_chunk(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_is_a_single_chunk() {
        let chunks = content_dependent_chunking("hi", 4, 2, 256).unwrap();
        assert_eq!(chunks, vec!["hi".to_string()]);
    }

    #[test]
    fn chunks_cover_the_whole_input_in_order() {
        let input = "the quick brown fox jumps over the lazy dog and then jumps back again";
        let chunks = content_dependent_chunking(input, 4, 3, 64).unwrap();
        assert_eq!(chunks.concat(), input);
        assert!(chunks.len() > 1);
    }

    #[test]
    fn identical_inputs_chunk_identically() {
        let input = "reconciliation reconciliation reconciliation";
        let a = content_dependent_chunking(input, 3, 2, 32).unwrap();
        let b = content_dependent_chunking(input, 3, 2, 32).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(
            content_dependent_chunking("", 2, 2, 32).unwrap_err(),
            ReconcileError::InvalidArgument(_)
        ));
    }

    #[test]
    fn a_local_edit_only_perturbs_nearby_chunks() {
        let base = "abcdefghijklmnopqrstuvwxyz0123456789abcdefghijklmnopqrstuvwxyz";
        let edited = "abcdefghijklmnopqrstuvwxyzXYZ123456789abcdefghijklmnopqrstuvwxyz";

        let a = content_dependent_chunking(base, 3, 3, 64).unwrap();
        let b = content_dependent_chunking(edited, 3, 3, 64).unwrap();

        let common_prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
        let common_suffix = a
            .iter()
            .rev()
            .zip(b.iter().rev())
            .take_while(|(x, y)| x == y)
            .count();
        assert!(common_prefix + common_suffix < a.len() + b.len());
    }
}
