//! Reconstructing the original chunk order from a shingle multiset by
//! retracing it as an Eulerian path (§4.7).
//!
//! A shingle multiset built by [`crate::shingle::ShingleMultiset::from_chunks`]
//! has exactly `step_num - 1` total edge occurrences, so any path of
//! `step_num` nodes starting at the sentinel's target necessarily exhausts
//! every edge — that's what makes it Eulerian. When the multiset is
//! ambiguous (more than one edge ordering retraces it), candidates are
//! enumerated in lexicographic tail order and `cycle_num` selects which
//! one — the `n`-th distinct full retracing, not `n` literal loops around
//! a cycle.

use crate::shingle::{ShingleMultiset, START};
use reconcile_core::error::{ReconcileError, Result};
use std::collections::{BTreeMap, HashMap};

/// Identifies one specific retracing of a shingle multiset: where it
/// starts, how many nodes it visits, and which of the (possibly several)
/// equally valid retracings it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleInfo {
    pub start: u64,
    pub step_num: u16,
    pub cycle_num: u16,
}

type Working = HashMap<u64, BTreeMap<u64, u16>>;

fn working_copy(set: &ShingleMultiset) -> Working {
    let mut working = Working::new();
    // START is a synthetic head never reachable through `tails_of` lookups
    // on anything but the sentinel, so collect it and every real head
    // that appears as a key in the set.
    for &head in std::iter::once(&START).chain(all_heads(set).iter()) {
        if let Some(tails) = set.tails_of(head) {
            working.insert(head, tails.iter().map(|(&t, &c)| (t, c)).collect());
        }
    }
    working
}

fn all_heads(set: &ShingleMultiset) -> Vec<u64> {
    // ShingleMultiset doesn't expose head iteration directly; reconstruct
    // it from every tail target, since every non-sentinel head was once a
    // tail of the edge before it.
    let mut heads = Vec::new();
    let mut stack = vec![START];
    let mut seen = std::collections::HashSet::new();
    while let Some(head) = stack.pop() {
        if !seen.insert(head) {
            continue;
        }
        heads.push(head);
        if let Some(tails) = set.tails_of(head) {
            stack.extend(tails.keys().copied());
        }
    }
    heads
}

fn consume(working: &mut Working, head: u64, tail: u64) -> Result<()> {
    let tails = working
        .get_mut(&head)
        .ok_or_else(|| ReconcileError::NotFound(format!("no edges from {head}")))?;
    match tails.get_mut(&tail) {
        Some(count) if *count > 0 => {
            *count -= 1;
            if *count == 0 {
                tails.remove(&tail);
            }
            Ok(())
        }
        _ => Err(ReconcileError::NotFound(format!(
            "shingle {head}:{tail} exhausted"
        ))),
    }
}

fn restore(working: &mut Working, head: u64, tail: u64) {
    *working.entry(head).or_default().entry(tail).or_insert(0) += 1;
}

/// Reconstruct the `cycle_num`-th (lexicographic) retracing of `set` that
/// visits `step_num` nodes starting at `start`.
pub fn backtracking_with_cycle(set: &ShingleMultiset, info: CycleInfo) -> Result<Vec<u64>> {
    if info.step_num < 1 || info.cycle_num < 1 {
        return Err(ReconcileError::InvalidArgument(format!(
            "step_num and cycle_num must both be at least 1, got {} and {}",
            info.step_num, info.cycle_num
        )));
    }
    if info.step_num == 1 {
        return Ok(vec![info.start]);
    }

    let mut working = working_copy(set);
    consume(&mut working, START, info.start)?;

    let mut path = vec![info.start];
    let mut remaining = info.cycle_num;
    let mut found = None;

    search(&mut working, &mut path, info.step_num as usize, &mut remaining, &mut found);

    found.ok_or_else(|| {
        ReconcileError::NotFound(format!(
            "no retracing of rank {} exists for this shingle set",
            info.cycle_num
        ))
    })
}

/// The inverse: given the actual chunk-hash sequence, find its rank in
/// the same lexicographic enumeration `backtracking_with_cycle` uses, so
/// a peer can describe this exact ordering compactly as a `CycleInfo`.
pub fn backtracking_with_string(set: &ShingleMultiset, hashes: &[u64]) -> Result<CycleInfo> {
    if hashes.is_empty() {
        return Err(ReconcileError::InvalidArgument(
            "hash sequence is empty".to_string(),
        ));
    }
    if hashes.len() == 1 {
        return Ok(CycleInfo {
            start: hashes[0],
            step_num: 1,
            cycle_num: 1,
        });
    }

    let mut working = working_copy(set);
    consume(&mut working, START, hashes[0])?;

    let mut path = vec![hashes[0]];
    let mut rank = 0u16;
    let found = search_match(&mut working, &mut path, hashes, &mut rank);

    if found {
        Ok(CycleInfo {
            start: hashes[0],
            step_num: hashes.len() as u16,
            cycle_num: rank,
        })
    } else {
        Err(ReconcileError::NotFound(
            "hash sequence is not a valid retracing of this shingle set".to_string(),
        ))
    }
}

fn search(
    working: &mut Working,
    path: &mut Vec<u64>,
    step_num: usize,
    remaining: &mut u16,
    found: &mut Option<Vec<u64>>,
) -> bool {
    if path.len() == step_num {
        *remaining -= 1;
        if *remaining == 0 {
            *found = Some(path.clone());
            return true;
        }
        return false;
    }

    let current = *path.last().unwrap();
    let candidates: Vec<u64> = working
        .get(&current)
        .map(|tails| tails.keys().copied().collect())
        .unwrap_or_default();

    for tail in candidates {
        if consume(working, current, tail).is_err() {
            continue;
        }
        path.push(tail);
        if search(working, path, step_num, remaining, found) {
            return true;
        }
        path.pop();
        restore(working, current, tail);
    }
    false
}

fn search_match(working: &mut Working, path: &mut Vec<u64>, target: &[u64], rank: &mut u16) -> bool {
    if path.len() == target.len() {
        *rank += 1;
        return path.as_slice() == target;
    }

    let current = *path.last().unwrap();
    let candidates: Vec<u64> = working
        .get(&current)
        .map(|tails| tails.keys().copied().collect())
        .unwrap_or_default();

    for tail in candidates {
        if consume(working, current, tail).is_err() {
            continue;
        }
        path.push(tail);
        if search_match(working, path, target, rank) {
            return true;
        }
        path.pop();
        restore(working, current, tail);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile_core::dictionary::Dictionary;

    #[test]
    fn unambiguous_chain_retraces_deterministically() {
        let mut dict = Dictionary::new();
        let chunks = vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()];
        let set = ShingleMultiset::from_chunks(&chunks, &mut dict).unwrap();
        let hashes: Vec<u64> = chunks.iter().map(|c| dict.add(c).unwrap()).collect();

        let info = backtracking_with_string(&set, &hashes).unwrap();
        let retraced = backtracking_with_cycle(&set, info).unwrap();
        assert_eq!(retraced, hashes);
    }

    #[test]
    fn single_chunk_round_trips_trivially() {
        let mut dict = Dictionary::new();
        let h = dict.add("solo").unwrap();
        let info = CycleInfo {
            start: h,
            step_num: 1,
            cycle_num: 1,
        };
        let set = ShingleMultiset::new();
        assert_eq!(backtracking_with_cycle(&set, info).unwrap(), vec![h]);
    }

    #[test]
    fn repeated_chunk_sequence_still_retraces() {
        let mut dict = Dictionary::new();
        let chunks = vec![
            "x".to_string(),
            "y".to_string(),
            "x".to_string(),
            "y".to_string(),
            "z".to_string(),
        ];
        let set = ShingleMultiset::from_chunks(&chunks, &mut dict).unwrap();
        let hashes: Vec<u64> = chunks.iter().map(|c| dict.add(c).unwrap()).collect();

        let info = backtracking_with_string(&set, &hashes).unwrap();
        let retraced = backtracking_with_cycle(&set, info).unwrap();
        assert_eq!(retraced, hashes);
    }
}
