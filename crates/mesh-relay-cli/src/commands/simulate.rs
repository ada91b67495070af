//! In-memory flood simulation.
//!
//! Builds a [`MemoryMesh`] in the requested shape, broadcasts one message
//! from `n0`, waits for the flood to settle, then reports what each node
//! delivered.

use std::time::Duration;

use anyhow::{bail, Context};
use mesh_relay::{MemoryMesh, MeshNode, RelayConfig};
use tracing::{debug, info};

use crate::cli::SimulateArgs;
use crate::output::{NodeReport, SimulationReport};
use crate::topology::Topology;

/// Resolves the relay configuration for a simulation.
pub fn load_config(args: &SimulateArgs) -> anyhow::Result<RelayConfig> {
    let mut config = match &args.config {
        Some(path) => RelayConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RelayConfig::default(),
    };
    if let Some(max_hops) = args.max_hops {
        config = config.with_max_hops(max_hops);
    }
    config.validate()?;
    Ok(config)
}

/// Runs a simulation and collects its report.
pub async fn simulate(args: &SimulateArgs) -> anyhow::Result<SimulationReport> {
    if args.nodes == 0 {
        bail!("a mesh needs at least one node");
    }
    let config = load_config(args)?;
    let topology = Topology::build(args.topology, args.nodes, args.density, args.seed);
    info!(
        topology = ?args.topology,
        nodes = topology.nodes.len(),
        links = topology.edges.len(),
        max_hops = config.max_hops,
        "starting simulation"
    );

    let mesh = MemoryMesh::new();
    let mut nodes = Vec::with_capacity(topology.nodes.len());
    for name in &topology.nodes {
        nodes.push(mesh.add_node(name, config.clone()).await?);
    }
    for (a, b) in topology.named_edges() {
        mesh.connect(a, b).await?;
    }

    let send_outcome = nodes[0]
        .handle
        .broadcast(args.content.as_bytes(), args.name.as_str())
        .await?;
    debug!(?send_outcome, "originated message");

    tokio::time::sleep(Duration::from_millis(args.settle_ms)).await;

    let distances = topology.distances_from_origin();
    let mut reports = Vec::with_capacity(nodes.len());
    for (node, distance) in nodes.iter_mut().zip(distances) {
        reports.push(collect(node, distance).await?);
    }
    mesh.shutdown().await;

    Ok(SimulationReport {
        topology: format!("{:?}", args.topology).to_lowercase(),
        max_hops: config.max_hops,
        links: topology.edges.len(),
        send_outcome,
        nodes: reports,
    })
}

async fn collect(node: &mut MeshNode, distance: Option<usize>) -> anyhow::Result<NodeReport> {
    let mut hop_count = None;
    let mut deliveries = 0;
    while let Ok(message) = node.inbox.try_recv() {
        hop_count.get_or_insert(message.hop_count);
        deliveries += 1;
    }
    Ok(NodeReport {
        name: node.name.clone(),
        distance,
        hop_count,
        deliveries,
        stats: node.handle.stats().await?,
    })
}
