//! aliddns - dynamic DNS client for Alibaba Cloud DNS
//!
//! Default mode runs a single sync pass and exits 0 only when at least one
//! record reached the desired state; `--daemon` keeps syncing on an
//! interval until SIGTERM.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use aliddns::config::Config;
use aliddns::daemon::{build_orchestrator, Daemon};

/// Application version
const VERSION: &str = "1.0.0";

//==============================================================================
// Main
//==============================================================================

#[derive(Debug, Parser)]
#[command(name = "aliddns")]
#[command(version = VERSION)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep running, re-syncing every configured interval
    #[arg(long)]
    daemon: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.clone()).context("Config load failed")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if args.verbose || config.verbose {
            "debug"
        } else {
            "info"
        })
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if args.daemon {
        let daemon = Daemon::new(config, args.config).context("Daemon setup failed")?;
        return daemon.run().await;
    }

    let orchestrator = build_orchestrator(&config).context("Client setup failed")?;
    let summary = orchestrator.sync_all(&config.records).await;
    if !summary.is_success() {
        std::process::exit(1);
    }

    Ok(())
}
