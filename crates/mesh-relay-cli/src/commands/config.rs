//! Default configuration output.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use mesh_relay::RelayConfig;
use tracing::info;

/// Writes the default configuration to `output`, or to `writer` when no path is given.
pub fn init_config<W: Write>(output: Option<&Path>, writer: &mut W) -> anyhow::Result<()> {
    let toml = RelayConfig::default().to_toml()?;
    match output {
        Some(path) => {
            std::fs::write(path, toml)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "wrote default config");
        }
        None => writer.write_all(toml.as_bytes())?,
    }
    Ok(())
}
