//! The common two-party reconciliation interface every algorithm presents
//! (§4.9), and the byte-counter/freeze-local bookkeeping shared by every
//! implementation.

use reconcile_core::error::Result;
use reconcile_core::set::ReconSet;
use reconcile_transport::Connection;

/// A peer that can reconcile its local set with a remote one over a single
/// TCP connection. A peer is single-owner for the duration of a session:
/// `sync_client`/`sync_server` take `&mut self`, so the borrow checker
/// forbids two sessions running on the same `Peer` concurrently (§5).
pub trait ReconcilePeer {
    fn add_element(&mut self, elem: &[u8]) -> Result<()>;

    fn delete_element(&mut self, elem: &[u8]) -> Result<()>;

    /// When frozen, a successful session still learns the remote's
    /// contents for resynchronization purposes but never absorbs them
    /// into the local set (§4.9 step 5). Symmetric: a session where both
    /// sides freeze is a complete no-op on both ends, matching the later
    /// variant of the original rather than its initial client-only
    /// freeze flag.
    fn set_freeze_local(&mut self, freeze_local: bool);

    fn get_local_set(&self) -> &ReconSet;

    /// Elements learned and absorbed during the most recent successful
    /// session, or an error if the last session failed or none has run.
    fn get_set_additions(&self) -> Result<&ReconSet>;

    fn sent_bytes(&self) -> u64;

    fn received_bytes(&self) -> u64;

    fn total_bytes(&self) -> u64 {
        self.sent_bytes() + self.received_bytes()
    }
}

/// Byte counters and freeze/success bookkeeping common to every peer
/// implementation — factored out so `FullPeer`/`IbltPeer`/`RcdsPeer`
/// don't each redeclare it.
#[derive(Debug, Default)]
pub struct SessionState {
    pub freeze_local: bool,
    pub sync_succeeded: bool,
    pub additions: ReconSet,
}

impl SessionState {
    pub fn begin_session(&mut self) {
        self.additions = ReconSet::new();
        self.sync_succeeded = false;
    }

    pub fn finish_session(&mut self) {
        self.sync_succeeded = true;
    }
}

pub(crate) fn counters_from(conn: &Connection) -> (u64, u64) {
    (conn.sent_bytes(), conn.received_bytes())
}
