//! In-memory mesh of relay nodes.
//!
//! [`MemoryMesh`] stands in for the proximity-networking layer: each node is a
//! real [`RelayNode`] and each undirected edge is a pair of links. A node's
//! link to a neighbour is identified by the neighbour's name, and a node's
//! origin id is its own name.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Weak};

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::link::LinkLayer;
use crate::node::{MessageInbox, RelayHandle, RelayNode};
use crate::protocol::{LinkId, OriginId};

#[derive(Debug, Default)]
struct MeshState {
    handles: HashMap<String, RelayHandle>,
    /// Undirected edges, stored with the smaller name first.
    edges: BTreeSet<(String, String)>,
}

impl MeshState {
    fn is_connected(&self, a: &str, b: &str) -> bool {
        self.edges.contains(&edge(a, b))
    }
}

fn edge(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Link layer of one node in a [`MemoryMesh`].
struct MemoryLink {
    name: String,
    origin: OriginId,
    mesh: Weak<RwLock<MeshState>>,
}

impl LinkLayer for MemoryLink {
    fn local_identity(&self) -> OriginId {
        self.origin.clone()
    }

    fn transmit(&self, link: LinkId, payload: Arc<[u8]>) -> BoxFuture<'_, Result<(), RelayError>> {
        Box::pin(async move {
            let state = self.mesh.upgrade().ok_or_else(|| RelayError::Transmit {
                link: link.clone(),
                reason: "mesh shut down".to_string(),
            })?;

            let peer = {
                let state = state.read().await;
                if !state.is_connected(&self.name, link.as_str()) {
                    return Err(RelayError::LinkNotConnected(link));
                }
                state.handles.get(link.as_str()).cloned()
            };
            let peer = peer.ok_or_else(|| RelayError::LinkNotConnected(link.clone()))?;

            peer.payload_received(self.name.as_str(), payload.to_vec())
                .await
                .map_err(|e| RelayError::Transmit {
                    link,
                    reason: e.to_string(),
                })
        })
    }
}

/// A node added to a [`MemoryMesh`].
#[derive(Debug)]
pub struct MeshNode {
    /// Node name, also its origin id.
    pub name: String,
    /// Handle to the node's relay.
    pub handle: RelayHandle,
    /// Messages the node delivered.
    pub inbox: MessageInbox,
}

/// Simulated proximity network connecting in-process relay nodes.
#[derive(Debug, Clone, Default)]
pub struct MemoryMesh {
    state: Arc<RwLock<MeshState>>,
}

impl MemoryMesh {
    /// Creates an empty mesh.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a relay node named `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a valid origin id, is already
    /// taken, or the configuration is invalid.
    pub async fn add_node(&self, name: &str, config: RelayConfig) -> Result<MeshNode, RelayError> {
        let origin = OriginId::new(name)?;
        let mut state = self.state.write().await;
        if state.handles.contains_key(name) {
            return Err(RelayError::InvalidField {
                field: "node name",
                reason: format!("{name} already exists"),
            });
        }

        let link = MemoryLink {
            name: name.to_string(),
            origin,
            mesh: Arc::downgrade(&self.state),
        };
        let node = RelayNode::spawn(config, Arc::new(link))?;
        state.handles.insert(name.to_string(), node.handle.clone());

        Ok(MeshNode {
            name: name.to_string(),
            handle: node.handle,
            inbox: node.inbox,
        })
    }

    /// Brings up a link between two nodes and notifies both.
    ///
    /// # Errors
    ///
    /// Returns an error if either node is unknown or has stopped.
    pub async fn connect(&self, a: &str, b: &str) -> Result<(), RelayError> {
        let (ha, hb) = {
            let mut state = self.state.write().await;
            let ha = Self::handle(&state, a)?;
            let hb = Self::handle(&state, b)?;
            state.edges.insert(edge(a, b));
            (ha, hb)
        };
        debug!(a, b, "mesh link up");
        ha.link_up(b).await?;
        hb.link_up(a).await
    }

    /// Tears down the link between two nodes and notifies both.
    ///
    /// # Errors
    ///
    /// Returns an error if either node is unknown or has stopped.
    pub async fn disconnect(&self, a: &str, b: &str) -> Result<(), RelayError> {
        let (ha, hb) = {
            let mut state = self.state.write().await;
            let ha = Self::handle(&state, a)?;
            let hb = Self::handle(&state, b)?;
            state.edges.remove(&edge(a, b));
            (ha, hb)
        };
        debug!(a, b, "mesh link down");
        ha.link_down(b).await?;
        hb.link_down(a).await
    }

    /// Returns true if the two nodes are linked.
    pub async fn is_connected(&self, a: &str, b: &str) -> bool {
        self.state.read().await.is_connected(a, b)
    }

    /// Returns the number of nodes.
    pub async fn node_count(&self) -> usize {
        self.state.read().await.handles.len()
    }

    /// Stops every node.
    pub async fn shutdown(&self) {
        let handles: Vec<_> = self.state.read().await.handles.values().cloned().collect();
        for handle in handles {
            let _ = handle.shutdown().await;
        }
    }

    fn handle(state: &MeshState, name: &str) -> Result<RelayHandle, RelayError> {
        state
            .handles
            .get(name)
            .cloned()
            .ok_or_else(|| RelayError::LinkNotConnected(LinkId::from(name)))
    }
}
