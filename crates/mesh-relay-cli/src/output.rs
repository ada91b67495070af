//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use anyhow::Context;
use mesh_relay::{RelayStats, SendOutcome};
use serde::Serialize;

use crate::cli::Format;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Write a value to the output.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> anyhow::Result<()>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .context("JSON serialization failed")?;
                writeln!(writer)?;
            }
            Format::Table => value.write_table(writer)?,
        }
        Ok(())
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    fn write_table<W: Write>(&self, writer: &mut W) -> std::io::Result<()>;
}

/// Outcome of one node in a simulation.
#[derive(Debug, Clone, Serialize)]
pub struct NodeReport {
    /// Node name.
    pub name: String,
    /// Links from the originator, if reachable.
    pub distance: Option<usize>,
    /// Hop count of the first delivery, if any.
    pub hop_count: Option<u32>,
    /// Number of deliveries. More than one is a dedup failure.
    pub deliveries: usize,
    /// Relay counters.
    pub stats: RelayStats,
}

/// Result of `simulate`.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Topology name.
    pub topology: String,
    /// Hop limit in force.
    pub max_hops: u32,
    /// Number of links.
    pub links: usize,
    /// Outcome of the originator's send.
    pub send_outcome: SendOutcome,
    /// Per-node outcomes, originator first.
    pub nodes: Vec<NodeReport>,
}

impl SimulationReport {
    /// Nodes other than the originator that delivered the message.
    #[must_use]
    pub fn reached(&self) -> usize {
        self.nodes.iter().skip(1).filter(|n| n.deliveries > 0).count()
    }
}

impl TableDisplay for SimulationReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "Simulation")?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Topology:     {}", self.topology)?;
        writeln!(writer, "Nodes:        {}", self.nodes.len())?;
        writeln!(writer, "Links:        {}", self.links)?;
        writeln!(writer, "Max hops:     {}", self.max_hops)?;
        writeln!(writer, "Send:         {:?}", self.send_outcome)?;
        writeln!(writer)?;

        writeln!(
            writer,
            "{:<8}  {:>8}  {:>5}  {:>9}  {:>9}  {:>10}  {:>8}",
            "NODE", "DISTANCE", "HOP", "DELIVERED", "FORWARDED", "DUPLICATES", "TTL-DROP"
        )?;
        writeln!(writer, "{}", "─".repeat(70))?;
        for node in &self.nodes {
            writeln!(
                writer,
                "{:<8}  {:>8}  {:>5}  {:>9}  {:>9}  {:>10}  {:>8}",
                node.name,
                dash(node.distance),
                dash(node.hop_count),
                node.deliveries,
                node.stats.forwarded,
                node.stats.duplicates_dropped,
                node.stats.ttl_exhausted,
            )?;
        }
        writeln!(writer)?;
        writeln!(
            writer,
            "Reached {} of {} other node(s)",
            self.reached(),
            self.nodes.len().saturating_sub(1)
        )
    }
}

/// Fields of a decoded payload.
#[derive(Debug, Clone, Serialize)]
pub struct DecodedPayload {
    /// Origin id.
    pub origin_id: String,
    /// Display name.
    pub display_name: String,
    /// Hop count.
    pub hop_count: u32,
    /// Content, lossily decoded as UTF-8.
    pub content: String,
    /// Fingerprint in base58.
    pub fingerprint: String,
}

impl TableDisplay for DecodedPayload {
    fn write_table<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "Origin:       {}", self.origin_id)?;
        writeln!(writer, "Name:         {}", self.display_name)?;
        writeln!(writer, "Hop count:    {}", self.hop_count)?;
        writeln!(writer, "Content:      {}", self.content)?;
        writeln!(writer, "Fingerprint:  {}", self.fingerprint)
    }
}

/// Wire form of an encoded message.
#[derive(Debug, Clone, Serialize)]
pub struct EncodedPayload {
    /// Payload text.
    pub payload: String,
    /// Fingerprint in base58.
    pub fingerprint: String,
}

impl TableDisplay for EncodedPayload {
    fn write_table<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "{}", self.payload)
    }
}

fn dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
