//! # mesh-relay
//!
//! Controlled-flooding message relay for ad-hoc mesh networks.
//!
//! A message originated on one device reaches every reachable device without
//! routing tables: each node delivers a message once, then re-broadcasts it
//! to every link except the one it arrived on. Propagation is bounded by a
//! hop limit and loops are cut by a time-windowed fingerprint cache.
//!
//! ## Core Types
//!
//! - [`Envelope`]: Wire envelope and its `|||`-delimited codec
//! - [`Fingerprint`]: Hop-independent deduplication key
//! - [`DedupCache`]: Time-windowed set of seen fingerprints
//! - [`RelayEngine`]: Synchronous relay state machine
//! - [`RelayNode`] / [`RelayHandle`]: Single-writer actor driving an engine
//! - [`LinkLayer`]: Transport boundary consumed by the relay
//! - [`MemoryMesh`]: In-process mesh for tests and simulation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod dedup;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod link;
pub mod mesh;
pub mod node;
pub mod protocol;

pub use config::RelayConfig;
pub use dedup::DedupCache;
pub use engine::{
    Dispatch, DropReason, Forwarding, ReceivedMessage, RelayEngine, RelayOutcome, RelayStats,
    SendOutcome, SendPlan, SendTarget,
};
pub use envelope::{Envelope, Fingerprint};
pub use error::{DecodeError, RelayError};
pub use link::{LinkEntry, LinkLayer, LinkSet};
pub use mesh::{MemoryMesh, MeshNode};
pub use node::{MessageInbox, RelayHandle, RelayNode};
pub use protocol::{LinkId, OriginId, DELIMITER};
