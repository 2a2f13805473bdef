//! `reconcile client` — connect to a listening peer and sync.

use anyhow::{Context, Result};
use reconcile_peer::{PeerFactory, ReconcilePeer};

use super::args::{Algorithm, SessionArgs};
use super::session::{build_options, report, seed_elements};

pub async fn run(args: SessionArgs) -> Result<()> {
    let addr = args.addr();
    if args.freeze_local {
        tracing::info!(%addr, "freeze-local set, this side will not adopt remote additions");
    }

    match args.algorithm {
        Algorithm::Full => {
            let mut peer = PeerFactory::new_full();
            if let Some(path) = &args.input {
                seed_elements(&mut peer, path)?;
            }
            peer.set_freeze_local(args.freeze_local);
            peer.sync_client(&addr).await.context("full sync failed")?;
            report(&peer);
        }
        Algorithm::Iblt => {
            let options = build_options(&args)?;
            let mut peer = PeerFactory::new_iblt(options);
            if let Some(path) = &args.input {
                seed_elements(&mut peer, path)?;
            }
            peer.set_freeze_local(args.freeze_local);
            peer.sync_client(&addr).await.context("iblt sync failed")?;
            report(&peer);
        }
        Algorithm::Rcds => {
            let options = build_options(&args)?;
            let mut peer = PeerFactory::new_rcds(options);
            if let Some(path) = &args.input {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("reading input file {path}"))?;
                peer.ingest_string(&contents)?;
            }
            peer.set_freeze_local(args.freeze_local);
            peer.sync_client(&addr).await.context("rcds sync failed")?;
            report(&peer);
            if let Some(remote) = peer.remote_content() {
                println!("reconstructed remote content:\n{remote}");
            }
        }
    }

    Ok(())
}
