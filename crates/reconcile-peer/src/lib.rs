//! Two-party reconciliation peers (§4.9): the `ReconcilePeer` trait and
//! its three algorithm-specific implementations, plus the option
//! descriptor and factory the CLI constructs them from (§4.10).

pub mod full_peer;
pub mod iblt_peer;
pub mod options;
pub mod peer;
pub mod rcds_peer;

pub use full_peer::FullPeer;
pub use iblt_peer::IbltPeer;
pub use options::{ReconcileOptions, ReconcileOptionsBuilder};
pub use peer::{ReconcilePeer, SessionState};
pub use rcds_peer::RcdsPeer;

/// Constructs a peer for a chosen algorithm from a completed
/// `ReconcileOptions` (§4.10's "factory" responsibility). FULL needs no
/// options at all — it always exchanges full sets — so `new_full` takes
/// none, matching the original's `NewFullPeer()` nullary constructor.
pub struct PeerFactory;

impl PeerFactory {
    pub fn new_full() -> FullPeer {
        FullPeer::new()
    }

    pub fn new_iblt(options: ReconcileOptions) -> IbltPeer {
        IbltPeer::new(options)
    }

    pub fn new_rcds(options: ReconcileOptions) -> RcdsPeer {
        RcdsPeer::new(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_builds_each_algorithm_variant() {
        let opts = ReconcileOptions::builder()
            .symmetric_set_diff(4)
            .data_len(4)
            .build()
            .unwrap();

        let full = PeerFactory::new_full();
        assert_eq!(full.get_local_set().len(), 0);

        let iblt = PeerFactory::new_iblt(opts.clone());
        assert_eq!(iblt.get_local_set().len(), 0);

        let rcds = PeerFactory::new_rcds(opts);
        assert_eq!(rcds.get_local_set().len(), 0);
    }
}
