//! Integration tests for relay nodes running concurrently over an in-memory mesh.
//!
//! Tests the node lifecycle end to end:
//! 1. Nodes spawn and learn their links
//! 2. A message floods the mesh through real worker tasks
//! 3. Each node surfaces it to its inbox at most once

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use mesh_relay::{
    LinkId, LinkLayer, MemoryMesh, MeshNode, OriginId, RelayConfig, RelayError, RelayHandle,
    RelayNode, RelayStats, SendOutcome,
};
use tokio::time::{sleep, timeout};

// ============================================================================
// Helper Functions
// ============================================================================

const WAIT: Duration = Duration::from_secs(5);
const POLL: Duration = Duration::from_millis(2);

async fn build(mesh: &MemoryMesh, names: &[&str], config: &RelayConfig) -> Vec<MeshNode> {
    let mut nodes = Vec::new();
    for name in names {
        nodes.push(mesh.add_node(name, config.clone()).await.unwrap());
    }
    nodes
}

async fn link_chain(mesh: &MemoryMesh, names: &[&str]) {
    for pair in names.windows(2) {
        mesh.connect(pair[0], pair[1]).await.unwrap();
    }
}

/// Polls a node's stats until `done` holds.
async fn wait_for_stats(handle: &RelayHandle, done: impl Fn(&RelayStats) -> bool) -> RelayStats {
    timeout(WAIT, async {
        loop {
            let stats = handle.stats().await.unwrap();
            if done(&stats) {
                return stats;
            }
            sleep(POLL).await;
        }
    })
    .await
    .expect("stats condition not reached")
}

/// Inbound payloads processed across `nodes`, delivered or dropped as duplicates.
async fn payloads_processed(nodes: &[MeshNode]) -> u64 {
    let mut total = 0;
    for node in nodes {
        let stats = node.handle.stats().await.unwrap();
        total += stats.delivered + stats.duplicates_dropped;
    }
    total
}

/// Drains everything a node has delivered so far.
fn drain(node: &mut MeshNode) -> Vec<u32> {
    let mut hops = Vec::new();
    while let Ok(message) = node.inbox.try_recv() {
        hops.push(message.hop_count);
    }
    hops
}

// ============================================================================
// Flooding Tests
// ============================================================================

#[tokio::test]
async fn chain_flood_respects_hop_limit() {
    let names = ["A", "B", "C", "D", "E", "F", "G", "H"];
    let mesh = MemoryMesh::new();
    let mut nodes = build(&mesh, &names, &RelayConfig::default()).await;
    link_chain(&mesh, &names).await;

    let outcome = nodes[0].handle.broadcast("Hello", "Alice").await.unwrap();
    assert_eq!(outcome, SendOutcome::Dispatched);

    // G is the last hop; once it has stopped the flood every earlier node has delivered.
    let g = wait_for_stats(&nodes[6].handle, |s| s.ttl_exhausted == 1).await;
    let hops: Vec<Vec<u32>> = nodes.iter_mut().map(drain).collect();
    assert_eq!(
        hops,
        vec![vec![], vec![0], vec![1], vec![2], vec![3], vec![4], vec![5], vec![]]
    );
    assert_eq!(g.forwarded, 0);

    mesh.shutdown().await;
}

#[tokio::test]
async fn full_mesh_delivers_once_per_node() {
    let names = ["n0", "n1", "n2", "n3", "n4", "n5"];
    let mesh = MemoryMesh::new();
    let mut nodes = build(&mesh, &names, &RelayConfig::default()).await;
    for (i, a) in names.iter().enumerate() {
        for b in &names[i + 1..] {
            mesh.connect(a, b).await.unwrap();
        }
    }

    nodes[0].handle.broadcast("all", "n0").await.unwrap();

    // n0 sends 5 copies and each of the 5 others relays to its 4 remaining links.
    let expected = 5 + 5 * 4;
    timeout(WAIT, async {
        while payloads_processed(&nodes).await < expected {
            sleep(POLL).await;
        }
    })
    .await
    .expect("flood did not finish");
    assert_eq!(payloads_processed(&nodes).await, expected);

    assert!(drain(&mut nodes[0]).is_empty());
    for node in &mut nodes[1..] {
        assert_eq!(drain(node), vec![0], "node {}", node.name);
    }

    mesh.shutdown().await;
}

#[tokio::test]
async fn delivered_message_carries_origin_and_arrival_link() {
    let mesh = MemoryMesh::new();
    let mut nodes = build(&mesh, &["A", "B", "C"], &RelayConfig::default()).await;
    link_chain(&mesh, &["A", "B", "C"]).await;

    nodes[0].handle.broadcast("Hello", "Alice").await.unwrap();
    let message = timeout(Duration::from_secs(1), nodes[2].inbox.recv())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(message.origin_id, OriginId::new("A").unwrap());
    assert_eq!(message.origin_display_name, "Alice");
    assert_eq!(message.content_lossy(), "Hello");
    assert_eq!(message.hop_count, 1);
    assert_eq!(message.arrival_link, LinkId::from("B"));

    mesh.shutdown().await;
}

#[tokio::test]
async fn content_with_delimiter_survives_relay() {
    let mesh = MemoryMesh::new();
    let mut nodes = build(&mesh, &["A", "B", "C"], &RelayConfig::default()).await;
    link_chain(&mesh, &["A", "B", "C"]).await;

    nodes[0].handle.broadcast("a|||b|||c", "Alice").await.unwrap();
    let message = timeout(Duration::from_secs(1), nodes[2].inbox.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.content, b"a|||b|||c");

    mesh.shutdown().await;
}

#[tokio::test]
async fn distinct_messages_are_not_confused() {
    let mesh = MemoryMesh::new();
    let mut nodes = build(&mesh, &["A", "B"], &RelayConfig::default()).await;
    mesh.connect("A", "B").await.unwrap();

    nodes[0].handle.broadcast("one", "A").await.unwrap();
    nodes[0].handle.broadcast("two", "A").await.unwrap();
    nodes[1].handle.broadcast("one", "B").await.unwrap();
    wait_for_stats(&nodes[1].handle, |s| s.delivered == 2).await;
    wait_for_stats(&nodes[0].handle, |s| s.delivered == 1).await;

    // B's "one" has a different origin, so A delivers it.
    assert_eq!(drain(&mut nodes[1]).len(), 2);
    assert_eq!(drain(&mut nodes[0]).len(), 1);

    mesh.shutdown().await;
}

// ============================================================================
// Membership Tests
// ============================================================================

#[tokio::test]
async fn disconnected_node_misses_later_messages() {
    let mesh = MemoryMesh::new();
    let mut nodes = build(&mesh, &["A", "B", "C"], &RelayConfig::default()).await;
    link_chain(&mesh, &["A", "B", "C"]).await;

    mesh.disconnect("B", "C").await.unwrap();
    nodes[0].handle.broadcast("after", "A").await.unwrap();
    let b = wait_for_stats(&nodes[1].handle, |s| s.delivered == 1).await;

    assert_eq!(drain(&mut nodes[1]), vec![0]);
    assert!(drain(&mut nodes[2]).is_empty());
    assert_eq!(b.forwarded, 0);

    mesh.shutdown().await;
}

#[tokio::test]
async fn broadcast_with_no_links_reports_no_peers() {
    let mesh = MemoryMesh::new();
    let nodes = build(&mesh, &["solo"], &RelayConfig::default()).await;
    let outcome = nodes[0].handle.broadcast("hi", "solo").await.unwrap();
    assert_eq!(outcome, SendOutcome::NoPeers);
    mesh.shutdown().await;
}

#[tokio::test]
async fn targeted_send_over_live_link() {
    let mesh = MemoryMesh::new();
    let mut nodes = build(&mesh, &["A", "B", "C"], &RelayConfig::default()).await;
    mesh.connect("A", "B").await.unwrap();
    mesh.connect("A", "C").await.unwrap();

    let outcome = nodes[0]
        .handle
        .send("dm", "Alice", Some(LinkId::from("C")))
        .await
        .unwrap();
    assert_eq!(outcome, SendOutcome::Dispatched);

    let message = timeout(WAIT, nodes[2].inbox.recv()).await.unwrap().unwrap();
    assert_eq!(message.hop_count, 0);
    let c = wait_for_stats(&nodes[2].handle, |s| s.delivered == 1).await;
    assert_eq!(c.forwarded, 0);
    assert!(drain(&mut nodes[1]).is_empty());

    mesh.shutdown().await;
}

#[tokio::test]
async fn targeted_send_to_unknown_link_fails() {
    let mesh = MemoryMesh::new();
    let nodes = build(&mesh, &["A", "B"], &RelayConfig::default()).await;
    mesh.connect("A", "B").await.unwrap();

    let outcome = nodes[0]
        .handle
        .send("dm", "Alice", Some(LinkId::from("nobody")))
        .await
        .unwrap();
    assert_eq!(outcome, SendOutcome::TransmitFailed);

    mesh.shutdown().await;
}

#[tokio::test]
async fn invalid_display_name_is_an_error() {
    let mesh = MemoryMesh::new();
    let nodes = build(&mesh, &["A", "B"], &RelayConfig::default()).await;
    mesh.connect("A", "B").await.unwrap();

    let result = nodes[0].handle.broadcast("x", "bad|||name").await;
    assert!(matches!(result, Err(RelayError::InvalidField { .. })));

    mesh.shutdown().await;
}

// ============================================================================
// Link Layer Tests
// ============================================================================

/// Link layer whose every transmission fails.
struct DeadLinks;

impl LinkLayer for DeadLinks {
    fn local_identity(&self) -> OriginId {
        OriginId::new("dead").unwrap()
    }

    fn transmit(&self, link: LinkId, _payload: Arc<[u8]>) -> BoxFuture<'_, Result<(), RelayError>> {
        Box::pin(async move {
            Err(RelayError::Transmit {
                link,
                reason: "radio off".to_string(),
            })
        })
    }
}

#[tokio::test]
async fn failed_transmits_are_counted_not_fatal() {
    let node = RelayNode::spawn(RelayConfig::default(), Arc::new(DeadLinks)).unwrap();
    node.handle.link_up("a").await.unwrap();
    node.handle.link_up("b").await.unwrap();

    let outcome = node.handle.broadcast("hi", "dead").await.unwrap();
    assert_eq!(outcome, SendOutcome::Dispatched);

    let targeted = node
        .handle
        .send("dm", "dead", Some(LinkId::from("a")))
        .await
        .unwrap();
    assert_eq!(targeted, SendOutcome::TransmitFailed);

    let stats = wait_for_stats(&node.handle, |s| s.transmit_failures == 3).await;
    assert_eq!(stats.originated, 2);

    node.handle.shutdown().await.unwrap();
    node.task.await.unwrap();
}

#[tokio::test]
async fn node_stops_after_shutdown() {
    let node = RelayNode::spawn(RelayConfig::default(), Arc::new(DeadLinks)).unwrap();
    let handle = node.handle.clone();
    handle.shutdown().await.unwrap();
    node.task.await.unwrap();

    assert!(matches!(handle.stats().await, Err(RelayError::NodeStopped)));
}

#[tokio::test]
async fn invalid_config_refuses_to_spawn() {
    let config = RelayConfig::default().with_max_hops(0);
    assert!(RelayNode::spawn(config, Arc::new(DeadLinks)).is_err());
}
