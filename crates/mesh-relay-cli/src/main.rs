//! `mesh-relay` binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mesh_relay_cli::cli::{Cli, Commands, Format};
use mesh_relay_cli::commands;
use mesh_relay_cli::output::OutputFormat;

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mesh_relay=info,mesh_relay_cli=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Simulate(args) => {
            let format = if args.json { Format::Json } else { cli.format };
            let report = commands::simulate(&args).await?;
            OutputFormat::new(format).write(&mut stdout, &report)?;
        }
        Commands::Decode { payload } => {
            let decoded = commands::decode(&payload)?;
            OutputFormat::new(cli.format).write(&mut stdout, &decoded)?;
        }
        Commands::Encode(args) => {
            let encoded = commands::encode(&args)?;
            OutputFormat::new(cli.format).write(&mut stdout, &encoded)?;
        }
        Commands::InitConfig { output } => {
            commands::init_config(output.as_deref(), &mut stdout)?;
        }
    }

    Ok(())
}
