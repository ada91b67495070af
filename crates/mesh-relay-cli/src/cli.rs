//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Mesh relay tooling: simulate controlled flooding and inspect wire payloads.
#[derive(Parser, Debug, Clone)]
#[command(name = "mesh-relay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table, global = true)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run an in-memory mesh and flood one message through it.
    Simulate(SimulateArgs),

    /// Decode one wire payload and print its fields.
    Decode {
        /// Payload text, e.g. `abc|||Alice|||0|||Hello`.
        payload: String,
    },

    /// Encode a message into its wire form.
    Encode(EncodeArgs),

    /// Write the default relay configuration as TOML.
    InitConfig {
        /// Destination file. Prints to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Shape of a simulated mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TopologyKind {
    /// n0 - n1 - ... - nN.
    Chain,
    /// A chain whose ends are linked.
    Ring,
    /// Three fully linked nodes.
    Triangle,
    /// n0 linked to every other node.
    Star,
    /// Every pair linked.
    Full,
    /// A random spanning tree plus random extra links.
    Random,
}

/// Arguments for `simulate`.
#[derive(clap::Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Mesh shape.
    #[arg(short, long, value_enum, default_value_t = TopologyKind::Chain)]
    pub topology: TopologyKind,

    /// Number of nodes. Ignored for `triangle`.
    #[arg(short, long, default_value_t = 7)]
    pub nodes: usize,

    /// Hop limit. Overrides the config file.
    #[arg(long)]
    pub max_hops: Option<u32>,

    /// Message content sent from n0.
    #[arg(short, long, default_value = "Hello")]
    pub content: String,

    /// Display name attached to the message.
    #[arg(long, default_value = "n0")]
    pub name: String,

    /// Relay configuration file.
    #[arg(long, env = "MESH_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Seed for the `random` topology.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Probability of each extra link in the `random` topology.
    #[arg(long, default_value_t = 0.2)]
    pub density: f64,

    /// How long to let the flood settle before collecting results, in milliseconds.
    #[arg(long, default_value_t = 250)]
    pub settle_ms: u64,

    /// Shorthand for `--format json`.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `encode`.
#[derive(clap::Args, Debug, Clone)]
pub struct EncodeArgs {
    /// Origin id.
    #[arg(long)]
    pub origin: String,

    /// Display name.
    #[arg(long)]
    pub name: String,

    /// Hop count.
    #[arg(long, default_value_t = 0)]
    pub hops: u32,

    /// Message content.
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn simulate_defaults() {
        let cli = Cli::parse_from(["mesh-relay", "simulate"]);
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.topology, TopologyKind::Chain);
        assert_eq!(args.nodes, 7);
        assert!(args.max_hops.is_none());
        assert_eq!(cli.format, Format::Table);
    }

    #[test]
    fn simulate_with_options() {
        let cli = Cli::parse_from([
            "mesh-relay",
            "simulate",
            "--topology",
            "ring",
            "--nodes",
            "5",
            "--max-hops",
            "2",
            "--content",
            "hi",
            "--json",
        ]);
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.topology, TopologyKind::Ring);
        assert_eq!(args.nodes, 5);
        assert_eq!(args.max_hops, Some(2));
        assert_eq!(args.content, "hi");
        assert!(args.json);
    }

    #[test]
    fn encode_args() {
        let cli = Cli::parse_from([
            "mesh-relay", "encode", "--origin", "abc", "--name", "Alice", "--hops", "3", "Hello",
        ]);
        let Commands::Encode(args) = cli.command else {
            panic!("expected encode");
        };
        assert_eq!(args.origin, "abc");
        assert_eq!(args.hops, 3);
        assert_eq!(args.content, "Hello");
    }

    #[test]
    fn global_format_flag() {
        let cli = Cli::parse_from(["mesh-relay", "decode", "a|||b|||0|||c", "--format", "json"]);
        assert_eq!(cli.format, Format::Json);
    }
}
