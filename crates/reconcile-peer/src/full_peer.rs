//! Full-set exchange (§4.9, algorithm `full`): compare digests, and if
//! they differ, exchange entire sets and let each side absorb what it was
//! missing. Simplest of the three algorithms, and the fallback when the
//! expected symmetric difference isn't known ahead of time.
//!
//! Grounded directly on
//! `examples/original_source/pkg/lib/algorithm/full_sync/sync.go`.

use crate::peer::{ReconcilePeer, SessionState};
use reconcile_core::element::ElementKey;
use reconcile_core::error::Result;
use reconcile_core::set::ReconSet;
use reconcile_transport::{Connection, ControlByte};

#[derive(Debug, Default)]
pub struct FullPeer {
    set: ReconSet,
    state: SessionState,
    sent_bytes: u64,
    received_bytes: u64,
}

impl FullPeer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sync_client(&mut self, addr: &str) -> Result<()> {
        self.state.begin_session();
        let mut conn = Connection::connect(addr).await?;

        let remote_digest = recv_u64(&mut conn).await?;
        if remote_digest == self.set.digest() {
            conn.send_control(ControlByte::Skip).await?;
            self.latch_counters(&conn);
            self.state.finish_session();
            return Ok(());
        }
        conn.send_control(ControlByte::Continue).await?;

        send_elements(&mut conn, &self.set).await?;

        if self.state.freeze_local {
            conn.send_control(ControlByte::Skip).await?;
        } else {
            conn.send_control(ControlByte::Continue).await?;
            let received = recv_elements(&mut conn).await?;
            for (key, literal) in received {
                self.set.insert(key.clone(), literal.clone());
                self.state.additions.insert(key, literal);
            }
        }

        self.latch_counters(&conn);
        self.state.finish_session();
        Ok(())
    }

    pub async fn sync_server(&mut self, addr: &str) -> Result<()> {
        self.state.begin_session();
        let mut conn = Connection::listen(addr).await?;

        send_u64(&mut conn, self.set.digest()).await?;

        let status = conn.recv_control().await?;
        if status.is_skip() {
            self.latch_counters(&conn);
            self.state.finish_session();
            return Ok(());
        }

        let remote_elements = recv_elements(&mut conn).await?;
        let mut remote_set = ReconSet::new();
        for (key, literal) in &remote_elements {
            remote_set.insert(key.clone(), literal.clone());
        }

        if !self.state.freeze_local {
            for (key, literal) in remote_set.difference(&self.set).iter() {
                self.set.insert(key.clone(), literal.clone());
                self.state.additions.insert(key.clone(), literal.clone());
            }
        }

        let status = conn.recv_control().await?;
        if !status.is_skip() {
            let diff = self.set.difference(&remote_set);
            send_elements(&mut conn, &diff).await?;
        }

        self.latch_counters(&conn);
        self.state.finish_session();
        Ok(())
    }

    fn latch_counters(&mut self, conn: &Connection) {
        self.sent_bytes = conn.sent_bytes();
        self.received_bytes = conn.received_bytes();
    }
}

async fn send_u64(conn: &mut Connection, value: u64) -> Result<()> {
    conn.send(&value.to_le_bytes()).await?;
    Ok(())
}

async fn recv_u64(conn: &mut Connection) -> Result<u64> {
    let bytes = conn.receive().await?;
    let mut buf = [0u8; 8];
    let n = bytes.len().min(8);
    buf[..n].copy_from_slice(&bytes[..n]);
    Ok(u64::from_le_bytes(buf))
}

async fn send_elements(conn: &mut Connection, set: &ReconSet) -> Result<()> {
    conn.send(&(set.len() as u32).to_le_bytes()).await?;
    for (key, literal) in set.iter() {
        let _ = key;
        conn.send(literal).await?;
    }
    Ok(())
}

async fn recv_elements(conn: &mut Connection) -> Result<Vec<(ElementKey, Vec<u8>)>> {
    let count_bytes = conn.receive().await?;
    let mut buf = [0u8; 4];
    let n = count_bytes.len().min(4);
    buf[..n].copy_from_slice(&count_bytes[..n]);
    let count = u32::from_le_bytes(buf);

    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let literal = conn.receive().await?;
        let key = ElementKey::from_bytes(literal.clone());
        out.push((key, literal));
    }
    Ok(out)
}

impl ReconcilePeer for FullPeer {
    fn add_element(&mut self, elem: &[u8]) -> Result<()> {
        self.set.insert_key(ElementKey::from_bytes(elem.to_vec()));
        Ok(())
    }

    fn delete_element(&mut self, elem: &[u8]) -> Result<()> {
        self.set.remove(&ElementKey::from_bytes(elem.to_vec()));
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
            return Err(reconcile_core::error::ReconcileError::SessionFailed(
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

    #[tokio::test]
    async fn converges_when_sets_differ() {
        let addr = "127.0.0.1:18820";

        let mut client = FullPeer::new();
        client.add_element(b"a").unwrap();
        client.add_element(b"b").unwrap();

        let mut server = FullPeer::new();
        server.add_element(b"b").unwrap();
        server.add_element(b"c").unwrap();

        let server_task = tokio::spawn(async move {
            server.sync_server(addr).await.unwrap();
            server
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        client.sync_client(addr).await.unwrap();
        let server = server_task.await.unwrap();

        assert_eq!(client.get_local_set().len(), 3);
        assert_eq!(server.get_local_set().len(), 3);
    }

    #[tokio::test]
    async fn skips_exchange_when_digests_match() {
        let addr = "127.0.0.1:18821";

        let mut client = FullPeer::new();
        client.add_element(b"same").unwrap();
        let mut server = FullPeer::new();
        server.add_element(b"same").unwrap();

        let server_task = tokio::spawn(async move {
            server.sync_server(addr).await.unwrap();
            server
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        client.sync_client(addr).await.unwrap();
        let server = server_task.await.unwrap();

        assert_eq!(client.total_bytes(), client.sent_bytes() + client.received_bytes());
        assert_eq!(server.get_local_set().len(), 1);
    }

    #[tokio::test]
    async fn frozen_client_does_not_absorb_server_additions() {
        let addr = "127.0.0.1:18822";

        let mut client = FullPeer::new();
        client.add_element(b"a").unwrap();
        client.set_freeze_local(true);

        let mut server = FullPeer::new();
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
