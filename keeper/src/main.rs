use anyhow::{Context, Result};
use clap::Parser;
use greenbox_keeper::{engine::Engine, Config};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a local greenbox chain and keep its reveal queue drained")]
struct Args {
    /// YAML configuration file.
    #[arg(short, long)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse args
    let args = Args::parse();

    // Load from config file
    let raw = std::fs::read_to_string(&args.config)
        .with_context(|| format!("read config file {}", args.config.display()))?;
    let config: Config = serde_yaml::from_str(&raw).context("parse config file")?;
    let config_debug = format!("{:?}", config.redacted_debug());
    let config = config.validate().context("validate config")?;

    // Setup logging
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();
    info!(config = %config_debug, "starting keeper");

    let summary = Engine::new(config)?.run().await?;
    info!(?summary, "keeper finished");
    if summary.mismatches > 0 {
        anyhow::bail!("{} reveals failed off-chain replay", summary.mismatches);
    }
    Ok(())
}
