//! Mesh shapes for simulation.
//!
//! Nodes are named `n0` through `n{N-1}`; `n0` is where messages originate.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cli::TopologyKind;

/// Nodes and undirected links of a simulated mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    /// Node names in index order.
    pub nodes: Vec<String>,
    /// Links as index pairs, smaller index first.
    pub edges: BTreeSet<(usize, usize)>,
}

impl Topology {
    /// Builds a topology of the given shape.
    ///
    /// `triangle` always has three nodes. `random` uses `seed` when given.
    #[must_use]
    pub fn build(kind: TopologyKind, nodes: usize, density: f64, seed: Option<u64>) -> Self {
        match kind {
            TopologyKind::Chain => Self::chain(nodes),
            TopologyKind::Ring => Self::ring(nodes),
            TopologyKind::Triangle => Self::full(3),
            TopologyKind::Star => Self::star(nodes),
            TopologyKind::Full => Self::full(nodes),
            TopologyKind::Random => {
                let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
                Self::random(nodes, density, &mut rng)
            }
        }
    }

    fn empty(n: usize) -> Self {
        Self {
            nodes: (0..n).map(|i| format!("n{i}")).collect(),
            edges: BTreeSet::new(),
        }
    }

    fn link(&mut self, a: usize, b: usize) {
        if a != b {
            self.edges.insert((a.min(b), a.max(b)));
        }
    }

    /// Each node linked to the next.
    #[must_use]
    pub fn chain(n: usize) -> Self {
        let mut topology = Self::empty(n);
        for i in 1..n {
            topology.link(i - 1, i);
        }
        topology
    }

    /// A chain closed into a loop. Needs at least three nodes to differ from a chain.
    #[must_use]
    pub fn ring(n: usize) -> Self {
        let mut topology = Self::chain(n);
        if n > 2 {
            topology.link(n - 1, 0);
        }
        topology
    }

    /// Node 0 linked to every other node.
    #[must_use]
    pub fn star(n: usize) -> Self {
        let mut topology = Self::empty(n);
        for i in 1..n {
            topology.link(0, i);
        }
        topology
    }

    /// Every pair linked.
    #[must_use]
    pub fn full(n: usize) -> Self {
        let mut topology = Self::empty(n);
        for a in 0..n {
            for b in (a + 1)..n {
                topology.link(a, b);
            }
        }
        topology
    }

    /// A random spanning tree, so every node is reachable, plus each other
    /// pair linked with probability `density`.
    pub fn random<R: Rng>(n: usize, density: f64, rng: &mut R) -> Self {
        let mut topology = Self::empty(n);
        for i in 1..n {
            let parent = rng.gen_range(0..i);
            topology.link(parent, i);
        }
        let density = if density.is_nan() { 0.0 } else { density.clamp(0.0, 1.0) };
        for a in 0..n {
            for b in (a + 1)..n {
                if rng.gen_bool(density) {
                    topology.link(a, b);
                }
            }
        }
        topology
    }

    /// Link pairs by node name.
    pub fn named_edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges
            .iter()
            .map(|&(a, b)| (self.nodes[a].as_str(), self.nodes[b].as_str()))
    }

    /// Hops from node 0 to every node, `None` where unreachable.
    ///
    /// A message relayed over `d` links arrives with hop count `d - 1`.
    #[must_use]
    pub fn distances_from_origin(&self) -> Vec<Option<usize>> {
        let mut distance = vec![None; self.nodes.len()];
        if self.nodes.is_empty() {
            return distance;
        }
        distance[0] = Some(0);
        let mut frontier = std::collections::VecDeque::from([0]);
        while let Some(node) = frontier.pop_front() {
            let next = distance[node].map_or(0, |d| d + 1);
            for &(a, b) in &self.edges {
                let neighbour = if a == node {
                    b
                } else if b == node {
                    a
                } else {
                    continue;
                };
                if distance[neighbour].is_none() {
                    distance[neighbour] = Some(next);
                    frontier.push_back(neighbour);
                }
            }
        }
        distance
    }
}
