//! IBLT-backed set reconciliation peer (§4.9 algorithm `iblt`): digest
//! short-circuit, parameter exchange, retry-escalation IBLT decode, and
//! optional hash-sync literal resolution.
//!
//! Grounded on `examples/original_source/pkg/lib/algorithm/iblt/sync.go`'s
//! `SyncClient`/`SyncServer` shape, adapted to Rust's `&mut self` session
//! model the way [`crate::full_peer::FullPeer`] already does for the
//! simpler FULL algorithm.

use crate::options::ReconcileOptions;
use crate::peer::{ReconcilePeer, SessionState};
use reconcile_core::element::ElementKey;
use reconcile_core::error::{ReconcileError, Result};
use reconcile_core::hash::crypto_digest;
use reconcile_core::set::ReconSet;
use reconcile_iblt::{table_size_for, Table};
use reconcile_transport::{Connection, ControlByte};

#[derive(Debug)]
pub struct IbltPeer {
    set: ReconSet,
    options: ReconcileOptions,
    state: SessionState,
    sent_bytes: u64,
    received_bytes: u64,
}

impl IbltPeer {
    pub fn new(options: ReconcileOptions) -> Self {
        Self {
            set: ReconSet::new(),
            options,
            state: SessionState::default(),
            sent_bytes: 0,
            received_bytes: 0,
        }
    }

    fn key_for(&self, elem: &[u8]) -> ElementKey {
        if self.options.hash_sync {
            ElementKey::from_bytes(crypto_digest(elem, self.options.hash_func))
        } else {
            ElementKey::from_bytes(elem.to_vec())
        }
    }

    /// Build the `attempt`-th escalated IBLT table over the current local
    /// set. Lazy by construction — only ever called for the attempt
    /// actually in flight (§9 "Retry escalation storage").
    fn build_table(&self, attempt: u32) -> Table {
        let constant = self.options.table_size_constant + attempt as f64;
        let (m, k) = table_size_for(self.options.symmetric_diff, constant);
        let mut table = Table::new(m, k, self.options.data_len, 1);
        for key in self.set.keys() {
            table
                .insert(key.as_bytes(), &[1u8])
                .expect("local keys were sized to data_len when inserted");
        }
        table
    }

    fn absorb(&mut self, key: ElementKey, literal: Vec<u8>) {
        self.set.insert(key.clone(), literal.clone());
        self.state.additions.insert(key, literal);
    }

    fn latch_counters(&mut self, conn: &Connection) {
        self.sent_bytes = conn.sent_bytes();
        self.received_bytes = conn.received_bytes();
    }

    pub async fn sync_client(&mut self, addr: &str) -> Result<()> {
        self.state.begin_session();
        let mut conn = Connection::connect(addr).await?;

        let remote_digest = conn.recv_u64().await?;
        if remote_digest == self.set.digest() {
            conn.send_control(ControlByte::Skip).await?;
            self.latch_counters(&conn);
            self.state.finish_session();
            return Ok(());
        }
        conn.send_control(ControlByte::Continue).await?;

        conn.send(&self.options.serialize()).await?;
        if conn.recv_skip("parameter mismatch").await? {
            return Err(ReconcileError::DecodeParameterMismatch(
                "server rejected our option descriptor".to_string(),
            ));
        }

        let mut attempt = 0u32;
        loop {
            let table = self.build_table(attempt);
            conn.send(&table.serialize()).await?;

            let done = conn.recv_skip("iblt decode settled").await?;
            if !done {
                attempt += 1;
                continue;
            }
            let status = conn.receive().await?;
            if status.first().copied() != Some(1) {
                return Err(ReconcileError::DecodeFailed);
            }
            break;
        }

        // Direction A: server absorbs Alpha (client-only elements).
        let server_absorbs = !conn.recv_skip("server frozen").await?;
        if server_absorbs && self.options.hash_sync {
            let keys = conn.recv_payload_vec().await?;
            let mut literals = Vec::with_capacity(keys.len());
            for key_bytes in &keys {
                let key = ElementKey::from_bytes(key_bytes.clone());
                let literal = self.set.literal(&key).ok_or_else(|| {
                    ReconcileError::NotFound(
                        "no local literal for a key the server claims is ours".to_string(),
                    )
                })?;
                literals.push(literal.to_vec());
            }
            conn.send_payload_vec(&literals).await?;
        }

        // Direction B: client absorbs Beta (server-only elements).
        conn.send_skip(self.state.freeze_local, "client frozen").await?;
        if !self.state.freeze_local {
            let literals = conn.recv_payload_vec().await?;
            for literal in literals {
                let key = self.key_for(&literal);
                self.absorb(key, literal);
            }
        }

        self.latch_counters(&conn);
        self.state.finish_session();
        Ok(())
    }

    pub async fn sync_server(&mut self, addr: &str) -> Result<()> {
        self.state.begin_session();
        let mut conn = Connection::listen(addr).await?;

        conn.send_u64(self.set.digest()).await?;
        if conn.recv_control().await?.is_skip() {
            self.latch_counters(&conn);
            self.state.finish_session();
            return Ok(());
        }

        let remote_options_bytes = conn.receive().await?;
        let remote_options = ReconcileOptions::deserialize(&remote_options_bytes)?;
        if remote_options != self.options {
            conn.send_control(ControlByte::Skip).await?;
            return Err(ReconcileError::DecodeParameterMismatch(
                "client option descriptor differs from ours".to_string(),
            ));
        }
        conn.send_control(ControlByte::Continue).await?;

        let max_retry = self.options.max_sync_retry;
        let (alpha, beta) = loop {
            let mut attempt = 0u32;
            let outcome = loop {
                let client_bytes = conn.receive().await?;
                let mut client_table = Table::deserialize(&client_bytes)?;
                let local_table = self.build_table(attempt);
                client_table.subtract(&local_table)?;

                match client_table.decode() {
                    Ok(diff) => break Some(diff),
                    Err(ReconcileError::DecodeFailed) if attempt < max_retry => {
                        conn.send_control(ControlByte::Continue).await?;
                        attempt += 1;
                        continue;
                    }
                    Err(ReconcileError::DecodeFailed) => break None,
                    Err(other) => return Err(other),
                }
            };

            conn.send_control(ControlByte::Skip).await?;
            match outcome {
                Some(diff) => {
                    conn.send(&[1u8]).await?;
                    break (diff.alpha, diff.beta);
                }
                None => {
                    conn.send(&[0u8]).await?;
                    return Err(ReconcileError::DecodeFailed);
                }
            }
        };

        // Direction A: server absorbs Alpha (client-only elements).
        conn.send_skip(self.state.freeze_local, "server frozen").await?;
        if !self.state.freeze_local {
            if self.options.hash_sync {
                conn.send_payload_vec(&alpha).await?;
                let literals = conn.recv_payload_vec().await?;
                if literals.len() != alpha.len() {
                    return Err(ReconcileError::Serialization(
                        "client returned a different number of literals than keys requested"
                            .to_string(),
                    ));
                }
                for (key_bytes, literal) in alpha.iter().zip(literals) {
                    self.absorb(ElementKey::from_bytes(key_bytes.clone()), literal);
                }
            } else {
                for key_bytes in &alpha {
                    self.absorb(ElementKey::from_bytes(key_bytes.clone()), key_bytes.clone());
                }
            }
        }

        // Direction B: client absorbs Beta (server-only elements) — the
        // server already holds the literal for each of its own elements,
        // hash-sync or not, so this wire step is unconditional (§4.9 step
        // 4's "Symmetrically" clause).
        let client_absorbs = !conn.recv_skip("client frozen").await?;
        if client_absorbs {
            let mut literals = Vec::with_capacity(beta.len());
            for key_bytes in &beta {
                let key = ElementKey::from_bytes(key_bytes.clone());
                let literal = self.set.literal(&key).ok_or_else(|| {
                    ReconcileError::NotFound("decoded beta key missing from local set".to_string())
                })?;
                literals.push(literal.to_vec());
            }
            conn.send_payload_vec(&literals).await?;
        }

        self.latch_counters(&conn);
        self.state.finish_session();
        Ok(())
    }
}

impl ReconcilePeer for IbltPeer {
    fn add_element(&mut self, elem: &[u8]) -> Result<()> {
        let key = self.key_for(elem);
        self.set.insert(key, elem.to_vec());
        Ok(())
    }

    fn delete_element(&mut self, elem: &[u8]) -> Result<()> {
        let key = self.key_for(elem);
        self.set.remove(&key);
        Ok(())
    }

    fn set_freeze_local(&mut self, freeze_local: bool) {
        self.state.freeze_local = freeze_local;
    }

    fn get_local_set(&self) -> &ReconSet {
        &self.set
    }

    fn get_set_additions(&self) -> Result<&ReconSet> {
        if !self.state.sync_succeeded {
            return Err(ReconcileError::SessionFailed(
                "last sync did not complete successfully".to_string(),
            ));
        }
        Ok(&self.state.additions)
    }

    fn sent_bytes(&self) -> u64 {
        self.sent_bytes
    }

    fn received_bytes(&self) -> u64 {
        self.received_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(diff: usize) -> ReconcileOptions {
        ReconcileOptions::builder()
            .symmetric_set_diff(diff)
            .data_len(4)
            .table_size_constant(4.0)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn converges_when_symmetric_difference_is_small() {
        let addr = "127.0.0.1:18910";

        let mut client = IbltPeer::new(options(8));
        let mut server = IbltPeer::new(options(8));

        for n in 0u32..40 {
            let elem = n.to_le_bytes().to_vec();
            client.add_element(&elem).unwrap();
            if n < 35 {
                server.add_element(&elem).unwrap();
            }
        }
        for n in 100u32..103 {
            server.add_element(&n.to_le_bytes()).unwrap();
        }

        let server_task = tokio::spawn(async move {
            server.sync_server(addr).await.unwrap();
            server
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        client.sync_client(addr).await.unwrap();
        let server = server_task.await.unwrap();

        assert_eq!(client.get_local_set().len(), server.get_local_set().len());
        assert_eq!(client.get_local_set().len(), 43);
    }

    #[tokio::test]
    async fn skips_exchange_when_digests_match() {
        let addr = "127.0.0.1:18911";

        let mut client = IbltPeer::new(options(4));
        client.add_element(b"same").unwrap();
        let mut server = IbltPeer::new(options(4));
        server.add_element(b"same").unwrap();

        let server_task = tokio::spawn(async move {
            server.sync_server(addr).await.unwrap();
            server
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        client.sync_client(addr).await.unwrap();
        let _server = server_task.await.unwrap();

        assert_eq!(client.total_bytes(), client.sent_bytes() + client.received_bytes());
        assert_eq!(client.get_set_additions().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn mismatched_options_abort_the_session() {
        let addr = "127.0.0.1:18912";

        let mut client = IbltPeer::new(options(4));
        client.add_element(b"a").unwrap();
        let mut server = IbltPeer::new(options(40));
        server.add_element(b"b").unwrap();

        let server_task = tokio::spawn(async move { server.sync_server(addr).await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let client_result = client.sync_client(addr).await;
        let server_result = server_task.await.unwrap();

        assert!(matches!(
            client_result.unwrap_err(),
            ReconcileError::DecodeParameterMismatch(_)
        ));
        assert!(matches!(
            server_result.unwrap_err(),
            ReconcileError::DecodeParameterMismatch(_)
        ));
    }

    #[tokio::test]
    async fn frozen_client_does_not_absorb_server_additions() {
        let addr = "127.0.0.1:18913";

        let mut client = IbltPeer::new(options(4));
        client.add_element(b"a").unwrap();
        client.set_freeze_local(true);

        let mut server = IbltPeer::new(options(4));
        server.add_element(b"b").unwrap();

        let server_task = tokio::spawn(async move {
            server.sync_server(addr).await.unwrap();
            server
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        client.sync_client(addr).await.unwrap();
        let server = server_task.await.unwrap();

        assert_eq!(client.get_local_set().len(), 1);
        assert_eq!(server.get_local_set().len(), 2);
    }
}
