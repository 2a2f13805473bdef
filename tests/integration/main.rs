//! Cross-peer protocol properties (§8): each test spins up a real
//! loopback TCP pair via `tokio::spawn` and drives both sides through
//! `reconcile-peer`'s public API, exactly as two independent processes
//! would over the wire.

use reconcile_peer::{PeerFactory, ReconcileOptions, ReconcilePeer};
use std::time::Duration;

async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

fn iblt_options(diff: usize) -> ReconcileOptions {
    ReconcileOptions::builder()
        .symmetric_set_diff(diff)
        .data_len(4)
        .table_size_constant(4.0)
        .build()
        .unwrap()
}

fn rcds_options() -> ReconcileOptions {
    ReconcileOptions::builder()
        .symmetric_set_diff(6)
        .data_len(8)
        .table_size_constant(4.0)
        .chunk_params(3, 3, 64)
        .build()
        .unwrap()
}

#[tokio::test]
async fn full_peers_converge_to_the_union() {
    let addr = "127.0.0.1:19100";

    let mut client = PeerFactory::new_full();
    client.add_element(b"alpha").unwrap();
    client.add_element(b"beta").unwrap();

    let mut server = PeerFactory::new_full();
    server.add_element(b"beta").unwrap();
    server.add_element(b"gamma").unwrap();

    let server_task = tokio::spawn(async move {
        server.sync_server(addr).await.unwrap();
        server
    });
    settle().await;
    client.sync_client(addr).await.unwrap();
    let server = server_task.await.unwrap();

    assert_eq!(client.get_local_set().len(), 3);
    assert_eq!(server.get_local_set().len(), 3);
    assert_eq!(client.get_local_set().digest(), server.get_local_set().digest());
}

#[tokio::test]
async fn full_peers_skip_on_matching_digest() {
    let addr = "127.0.0.1:19101";

    let mut client = PeerFactory::new_full();
    client.add_element(b"same").unwrap();
    let mut server = PeerFactory::new_full();
    server.add_element(b"same").unwrap();

    let server_task = tokio::spawn(async move {
        server.sync_server(addr).await.unwrap();
        server
    });
    settle().await;
    client.sync_client(addr).await.unwrap();
    let server = server_task.await.unwrap();

    assert_eq!(client.total_bytes(), client.sent_bytes() + client.received_bytes());
    assert_eq!(client.get_set_additions().unwrap().len(), 0);
    assert_eq!(server.get_set_additions().unwrap().len(), 0);
}

#[tokio::test]
async fn iblt_peers_converge_on_small_symmetric_difference() {
    let addr = "127.0.0.1:19102";

    let mut client = PeerFactory::new_iblt(iblt_options(10));
    let mut server = PeerFactory::new_iblt(iblt_options(10));

    for n in 0u32..30 {
        let elem = n.to_le_bytes().to_vec();
        client.add_element(&elem).unwrap();
        server.add_element(&elem).unwrap();
    }
    for n in 200u32..204 {
        client.add_element(&n.to_le_bytes()).unwrap();
    }
    for n in 300u32..303 {
        server.add_element(&n.to_le_bytes()).unwrap();
    }

    let server_task = tokio::spawn(async move {
        server.sync_server(addr).await.unwrap();
        server
    });
    settle().await;
    client.sync_client(addr).await.unwrap();
    let server = server_task.await.unwrap();

    assert_eq!(client.get_local_set().digest(), server.get_local_set().digest());
}

#[tokio::test]
async fn iblt_parameter_mismatch_aborts_both_sides() {
    let addr = "127.0.0.1:19103";

    let mut client = PeerFactory::new_iblt(iblt_options(4));
    client.add_element(b"a").unwrap();
    let mut server = PeerFactory::new_iblt(iblt_options(40));
    server.add_element(b"b").unwrap();

    let server_task = tokio::spawn(async move { server.sync_server(addr).await });
    settle().await;
    let client_result = client.sync_client(addr).await;
    let server_result = server_task.await.unwrap();

    assert!(client_result.is_err());
    assert!(server_result.is_err());
}

#[tokio::test]
async fn frozen_iblt_client_learns_nothing_the_server_does() {
    let addr = "127.0.0.1:19104";

    let mut client = PeerFactory::new_iblt(iblt_options(4));
    client.add_element(b"client-only").unwrap();
    client.set_freeze_local(true);

    let mut server = PeerFactory::new_iblt(iblt_options(4));
    server.add_element(b"server-only").unwrap();

    let server_task = tokio::spawn(async move {
        server.sync_server(addr).await.unwrap();
        server
    });
    settle().await;
    client.sync_client(addr).await.unwrap();
    let server = server_task.await.unwrap();

    assert_eq!(client.get_local_set().len(), 1);
    assert_eq!(server.get_local_set().len(), 2);
    assert_eq!(client.get_set_additions().unwrap().len(), 0);
}

#[tokio::test]
async fn rcds_peers_reconstruct_each_others_near_identical_text() {
    let addr = "127.0.0.1:19105";

    let mut client = PeerFactory::new_rcds(rcds_options());
    let mut server = PeerFactory::new_rcds(rcds_options());

    let client_text = "the quick brown fox jumps over the lazy dog and then jumps again";
    let server_text = "the quick brown fox leaps over the lazy dog and then jumps again";
    client.ingest_string(client_text).unwrap();
    server.ingest_string(server_text).unwrap();

    let server_task = tokio::spawn(async move {
        server.sync_server(addr).await.unwrap();
        server
    });
    settle().await;
    client.sync_client(addr).await.unwrap();
    let server = server_task.await.unwrap();

    assert_eq!(client.remote_content().unwrap(), server_text);
    assert_eq!(server.remote_content().unwrap(), client_text);
}

#[tokio::test]
async fn rcds_peers_skip_on_identical_content() {
    let addr = "127.0.0.1:19106";

    let text = "identical content on both sides";
    let mut client = PeerFactory::new_rcds(rcds_options());
    let mut server = PeerFactory::new_rcds(rcds_options());
    client.ingest_string(text).unwrap();
    server.ingest_string(text).unwrap();

    let server_task = tokio::spawn(async move {
        server.sync_server(addr).await.unwrap();
        server
    });
    settle().await;
    client.sync_client(addr).await.unwrap();
    let server = server_task.await.unwrap();

    assert!(client.remote_content().is_none());
    assert!(server.remote_content().is_none());
    assert_eq!(client.total_bytes(), client.sent_bytes() + client.received_bytes());
}

#[tokio::test]
async fn frozen_rcds_client_still_reconstructs_without_adopting() {
    let addr = "127.0.0.1:19107";

    let mut client = PeerFactory::new_rcds(rcds_options());
    let mut server = PeerFactory::new_rcds(rcds_options());

    let client_text = "the quick brown fox jumps over the lazy dog and then jumps again";
    let server_text = "the quick brown fox leaps over the lazy dog and then jumps again";
    client.ingest_string(client_text).unwrap();
    server.ingest_string(server_text).unwrap();
    client.set_freeze_local(true);

    let server_task = tokio::spawn(async move {
        server.sync_server(addr).await.unwrap();
        server
    });
    settle().await;
    client.sync_client(addr).await.unwrap();
    let _server = server_task.await.unwrap();

    assert_eq!(client.get_set_additions().unwrap().len(), 0);
    assert_eq!(client.remote_content().unwrap(), server_text);
}

#[tokio::test]
async fn byte_counters_balance_between_both_sides() {
    let addr = "127.0.0.1:19108";

    let mut client = PeerFactory::new_full();
    client.add_element(b"one").unwrap();
    let mut server = PeerFactory::new_full();
    server.add_element(b"two").unwrap();

    let server_task = tokio::spawn(async move {
        server.sync_server(addr).await.unwrap();
        server
    });
    settle().await;
    client.sync_client(addr).await.unwrap();
    let server = server_task.await.unwrap();

    assert_eq!(client.total_bytes(), client.sent_bytes() + client.received_bytes());
    assert_eq!(server.total_bytes(), server.sent_bytes() + server.received_bytes());
    assert!(client.sent_bytes() > 0);
    assert!(server.sent_bytes() > 0);
}
