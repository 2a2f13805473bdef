//! reconcile-iblt — Invertible Bloom Lookup Table set reconciliation.
//!
//! A `Table` of `m` cells, each touched by `k` independent hash functions
//! per element, supports `insert`/`delete` in O(k), `subtract` in O(m), and
//! `decode` by peeling pure cells until nothing more can be removed
//! (§4.8). The caller chooses `m`/`k` from the expected symmetric
//! difference via [`table_size_for`].

pub mod cell;
pub mod table;

pub use cell::Cell;
pub use table::{table_size_for, Diff, Table};
