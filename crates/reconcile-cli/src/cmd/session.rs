//! Shared pieces between `server` and `client`: option construction,
//! `--input` seeding, and the post-session summary both print.

use anyhow::{Context, Result};
use reconcile_peer::{ReconcileOptions, ReconcilePeer};
use std::fs;

use super::args::SessionArgs;

pub fn build_options(args: &SessionArgs) -> Result<ReconcileOptions> {
    ReconcileOptions::builder()
        .symmetric_set_diff(args.symmetric_diff)
        .max_sync_retries(args.max_retry)
        .table_size_constant(args.table_size_constant)
        .chunk_params(args.chunk_h, args.chunk_r, args.chunk_hs)
        .build()
        .context("invalid reconciliation options")
}

/// Seed a FULL/IBLT peer's set from a newline-delimited file of elements.
pub fn seed_elements(peer: &mut impl ReconcilePeer, path: &str) -> Result<()> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading element file {path}"))?;
    for line in contents.lines() {
        if line.is_empty() {
            continue;
        }
        peer.add_element(line.as_bytes())
            .with_context(|| format!("adding element {line:?}"))?;
    }
    Ok(())
}

pub fn report(peer: &impl ReconcilePeer) {
    println!(
        "sync complete: {} elements locally, {} bytes sent, {} bytes received",
        peer.get_local_set().len(),
        peer.sent_bytes(),
        peer.received_bytes(),
    );
    match peer.get_set_additions() {
        Ok(additions) if !additions.is_empty() => {
            println!("learned {} new element(s) this session", additions.len());
        }
        _ => {}
    }
}
