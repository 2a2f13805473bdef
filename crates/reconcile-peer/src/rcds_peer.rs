//! RCDS-backed string reconciliation peer (§4.9 algorithm `rcds`):
//! content-defined chunking, IBLT reconciliation of the resulting chunk
//! multiset, and shingle-multiset + cycle-info exchange so each side can
//! retrace and reconstruct the other's exact chunk ordering (§4.5-4.7).
//!
//! Grounded on `examples/original_source/pkg/lib/algorithm/rcds/sync.go`'s
//! session shape, reusing the chunk-level diffing [`crate::iblt_peer::IbltPeer`]
//! already implements rather than duplicating the IBLT codec here.

use crate::options::ReconcileOptions;
use crate::peer::{ReconcilePeer, SessionState};
use reconcile_core::dictionary::Dictionary;
use reconcile_core::element::ElementKey;
use reconcile_core::error::{ReconcileError, Result};
use reconcile_core::set::ReconSet;
use reconcile_iblt::{table_size_for, Table};
use reconcile_rcds::backtrack::{backtracking_with_cycle, backtracking_with_string, CycleInfo};
use reconcile_rcds::chunker::content_dependent_chunking;
use reconcile_rcds::shingle::{ShingleMultiset, START};
use reconcile_transport::{Connection, ControlByte};

#[derive(Debug)]
pub struct RcdsPeer {
    options: ReconcileOptions,
    dict: Dictionary,
    chunks: ReconSet,
    shingles: ShingleMultiset,
    own_hash_sequence: Vec<u64>,
    state: SessionState,
    reconstructed_remote: Option<String>,
    sent_bytes: u64,
    received_bytes: u64,
}

type Triple = (u64, u64, u16);

fn encode_triple(t: Triple) -> Vec<u8> {
    let mut out = Vec::with_capacity(18);
    out.extend_from_slice(&t.0.to_le_bytes());
    out.extend_from_slice(&t.1.to_le_bytes());
    out.extend_from_slice(&t.2.to_le_bytes());
    out
}

fn decode_triple(bytes: &[u8]) -> Result<Triple> {
    if bytes.len() != 18 {
        return Err(ReconcileError::Serialization(format!(
            "expected an 18-byte shingle triple, found {}",
            bytes.len()
        )));
    }
    let head = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
    let tail = u64::from_le_bytes(bytes[8..16].try_into().unwrap());
    let count = u16::from_le_bytes(bytes[16..18].try_into().unwrap());
    Ok((head, tail, count))
}

fn encode_cycle_info(info: CycleInfo) -> Vec<u8> {
    let mut out = Vec::with_capacity(12);
    out.extend_from_slice(&info.start.to_le_bytes());
    out.extend_from_slice(&info.step_num.to_le_bytes());
    out.extend_from_slice(&info.cycle_num.to_le_bytes());
    out
}

fn decode_cycle_info(bytes: &[u8]) -> Result<CycleInfo> {
    if bytes.len() != 12 {
        return Err(ReconcileError::Serialization(format!(
            "expected a 12-byte cycle descriptor, found {}",
            bytes.len()
        )));
    }
    Ok(CycleInfo {
        start: u64::from_le_bytes(bytes[0..8].try_into().unwrap()),
        step_num: u16::from_le_bytes(bytes[8..10].try_into().unwrap()),
        cycle_num: u16::from_le_bytes(bytes[10..12].try_into().unwrap()),
    })
}

fn build_shingle_set(triples: &[Triple]) -> ShingleMultiset {
    let mut set = ShingleMultiset::new();
    for &(head, tail, count) in triples {
        set.add_shingle(head, tail, count);
    }
    set
}

impl RcdsPeer {
    pub fn new(options: ReconcileOptions) -> Self {
        Self {
            options,
            dict: Dictionary::new(),
            chunks: ReconSet::new(),
            shingles: ShingleMultiset::new(),
            own_hash_sequence: Vec::new(),
            state: SessionState::default(),
            reconstructed_remote: None,
            sent_bytes: 0,
            received_bytes: 0,
        }
    }

    /// Replace this peer's document with `s`: chunk it, rebuild the local
    /// chunk set and its 2-shingle multiset. The natural top-level entry
    /// point for RCDS (§6 `--input` for this algorithm reads a whole file
    /// and calls this once), distinct from the low-level
    /// [`ReconcilePeer::add_element`]/[`ReconcilePeer::delete_element`]
    /// pair which mutate single chunks.
    pub fn ingest_string(&mut self, s: &str) -> Result<()> {
        let chunks = content_dependent_chunking(
            s,
            self.options.chunk_h,
            self.options.chunk_r,
            self.options.chunk_hash_space,
        )?;

        let mut dict = Dictionary::new();
        let shingles = ShingleMultiset::from_chunks(&chunks, &mut dict)?;
        let mut hash_sequence = Vec::with_capacity(chunks.len());
        let mut set = ReconSet::new();
        for chunk in &chunks {
            let hash = dict.add(chunk)?;
            hash_sequence.push(hash);
            set.insert(ElementKey::from_u64(hash), chunk.clone().into_bytes());
        }

        self.dict = dict;
        self.chunks = set;
        self.shingles = shingles;
        self.own_hash_sequence = hash_sequence;
        Ok(())
    }

    fn own_edges(&self) -> Vec<Triple> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        let mut prev = START;
        for &head in &self.own_hash_sequence {
            if seen.insert((prev, head)) {
                let count = self.shingles.get_count(prev, head);
                out.push((prev, head, count));
            }
            prev = head;
        }
        out
    }

    fn own_cycle_info(&self) -> Result<CycleInfo> {
        if self.own_hash_sequence.is_empty() {
            return Ok(CycleInfo::default());
        }
        backtracking_with_string(&self.shingles, &self.own_hash_sequence)
    }

    fn reconstruct(&self, peer_triples: &[Triple], peer_info: CycleInfo) -> Result<Option<String>> {
        if peer_info.step_num == 0 {
            return Ok(None);
        }
        let peer_set = build_shingle_set(peer_triples);
        let sequence = backtracking_with_cycle(&peer_set, peer_info)?;
        let mut out = String::new();
        for hash in sequence {
            out.push_str(self.dict.lookup(hash)?);
        }
        Ok(Some(out))
    }

    fn build_table(&self, attempt: u32) -> Table {
        let constant = self.options.table_size_constant + attempt as f64;
        let (m, k) = table_size_for(self.options.symmetric_diff, constant);
        let mut table = Table::new(m, k, 8, 1);
        for key in self.chunks.keys() {
            table
                .insert(key.as_bytes(), &[1u8])
                .expect("chunk hashes are always 8 bytes");
        }
        table
    }

    /// Record `literal`'s content in the dictionary so later backtracking
    /// can translate the remote's chunk hashes back into text, regardless
    /// of whether this peer goes on to adopt the chunk into its own set
    /// (§4.9 step 5's "still learns ... for resynchronization purposes").
    fn learn_chunk(&mut self, literal: &[u8]) -> Result<u64> {
        let text = String::from_utf8_lossy(literal).into_owned();
        self.dict.add(&text)
    }

    /// Add a learned chunk to this peer's own persistent set. Only called
    /// when not frozen.
    fn adopt_chunk(&mut self, hash: u64, literal: Vec<u8>) {
        let key = ElementKey::from_u64(hash);
        self.chunks.insert(key.clone(), literal.clone());
        self.state.additions.insert(key, literal);
    }

    fn chunk_hash_from_bytes(key_bytes: &[u8]) -> Result<u64> {
        let arr: [u8; 8] = key_bytes[..8].try_into().map_err(|_| {
            ReconcileError::Serialization("malformed chunk hash key".to_string())
        })?;
        Ok(u64::from_le_bytes(arr))
    }

    fn latch_counters(&mut self, conn: &Connection) {
        self.sent_bytes = conn.sent_bytes();
        self.received_bytes = conn.received_bytes();
    }

    async fn send_shingle_triples(&self, conn: &mut Connection, triples: &[Triple]) -> Result<()> {
        let payloads: Vec<Vec<u8>> = triples.iter().map(|&t| encode_triple(t)).collect();
        conn.send_payload_vec(&payloads).await?;
        Ok(())
    }

    async fn recv_shingle_triples(&self, conn: &mut Connection) -> Result<Vec<Triple>> {
        let payloads = conn.recv_payload_vec().await?;
        payloads.iter().map(|p| decode_triple(p)).collect()
    }

    pub async fn sync_client(&mut self, addr: &str) -> Result<()> {
        self.state.begin_session();
        let mut conn = Connection::connect(addr).await?;

        let remote_digest = conn.recv_u64().await?;
        if remote_digest == self.chunks.digest() {
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

        // Direction A: the server requests literals for the chunks unique
        // to us so it can learn their content; it decides for itself,
        // based on its own freeze-local flag, whether to also adopt them.
        let keys = conn.recv_payload_vec().await?;
        let mut literals = Vec::with_capacity(keys.len());
        for key_bytes in &keys {
            let hash = Self::chunk_hash_from_bytes(key_bytes)?;
            literals.push(self.dict.lookup(hash)?.as_bytes().to_vec());
        }
        conn.send_payload_vec(&literals).await?;

        // Direction B: the server's chunks unique to us arrive
        // unconditionally — we always learn them, and additionally adopt
        // them into our own set only if we aren't frozen.
        let literals = conn.recv_payload_vec().await?;
        for literal in literals {
            let hash = self.learn_chunk(&literal)?;
            if !self.state.freeze_local {
                self.adopt_chunk(hash, literal);
            }
        }

        self.send_shingle_triples(&mut conn, &self.own_edges()).await?;
        conn.send(&encode_cycle_info(self.own_cycle_info()?)).await?;

        let server_triples = self.recv_shingle_triples(&mut conn).await?;
        let server_info = decode_cycle_info(&conn.receive().await?)?;
        self.reconstructed_remote = self.reconstruct(&server_triples, server_info)?;

        self.latch_counters(&conn);
        self.state.finish_session();
        Ok(())
    }

    pub async fn sync_server(&mut self, addr: &str) -> Result<()> {
        self.state.begin_session();
        let mut conn = Connection::listen(addr).await?;

        conn.send_u64(self.chunks.digest()).await?;
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

        // Direction A: we request literals for the chunks unique to the
        // client so we can learn their content, adopting them into our own
        // set only if we aren't frozen.
        conn.send_payload_vec(&alpha).await?;
        let literals = conn.recv_payload_vec().await?;
        if literals.len() != alpha.len() {
            return Err(ReconcileError::Serialization(
                "client returned a different number of literals than keys requested".to_string(),
            ));
        }
        for literal in literals {
            let hash = self.learn_chunk(&literal)?;
            if !self.state.freeze_local {
                self.adopt_chunk(hash, literal);
            }
        }

        // Direction B: our chunks unique to the client are sent
        // unconditionally, regardless of our own freeze-local setting —
        // the client always needs them to learn and reconstruct.
        let mut literals = Vec::with_capacity(beta.len());
        for key_bytes in &beta {
            let hash = Self::chunk_hash_from_bytes(key_bytes)?;
            literals.push(self.dict.lookup(hash)?.as_bytes().to_vec());
        }
        conn.send_payload_vec(&literals).await?;

        let client_triples = self.recv_shingle_triples(&mut conn).await?;
        let client_info = decode_cycle_info(&conn.receive().await?)?;

        self.send_shingle_triples(&mut conn, &self.own_edges()).await?;
        conn.send(&encode_cycle_info(self.own_cycle_info()?)).await?;

        self.reconstructed_remote = self.reconstruct(&client_triples, client_info)?;

        self.latch_counters(&conn);
        self.state.finish_session();
        Ok(())
    }

    /// The peer's own content reassembled from the last successful
    /// session, or `None` if the remote had no content or no session has
    /// run yet.
    pub fn remote_content(&self) -> Option<&str> {
        self.reconstructed_remote.as_deref()
    }
}

impl ReconcilePeer for RcdsPeer {
    /// Adds a single already-chunked piece of content directly to the
    /// chunk set, bypassing `ingest_string`'s chunking and shingle
    /// bookkeeping — intended for low-level chunk-set manipulation, not
    /// everyday document updates.
    fn add_element(&mut self, elem: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(elem).into_owned();
        let hash = self.dict.add(&text)?;
        self.chunks.insert(ElementKey::from_u64(hash), elem.to_vec());
        Ok(())
    }

    fn delete_element(&mut self, elem: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(elem).into_owned();
        let hash = reconcile_core::hash::fnv64(text.as_bytes());
        self.chunks.remove(&ElementKey::from_u64(hash));
        Ok(())
    }

    fn set_freeze_local(&mut self, freeze_local: bool) {
        self.state.freeze_local = freeze_local;
    }

    fn get_local_set(&self) -> &ReconSet {
        &self.chunks
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
