//! # mesh-relay-cli
//!
//! Command-line tools for the mesh relay.
//!
//! Provides commands for:
//! - Flooding a message through an in-memory mesh and reporting per-node delivery
//! - Decoding and encoding wire payloads
//! - Writing a default configuration file

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod output;
pub mod topology;

pub use cli::{Cli, Commands, Format, SimulateArgs, TopologyKind};
pub use output::OutputFormat;
pub use topology::Topology;
