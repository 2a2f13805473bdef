//! reconcile-rcds — Recursive Content-Dependent Shingling: reconciling a
//! string by reducing it to reconciling a multiset of its content-defined
//! chunks' 2-shingles, then reconstructing the chunk sequence by
//! retracing an Eulerian path through that multiset (§4.5-§4.7).

pub mod backtrack;
pub mod chunker;
pub mod shingle;

pub use backtrack::{backtracking_with_cycle, backtracking_with_string, CycleInfo};
pub use chunker::content_dependent_chunking;
pub use shingle::ShingleMultiset;
