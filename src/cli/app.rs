use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::{init_logging, load_manifest, load_policy};

pub fn run() -> Result<()> {
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.debug)?;

    info!("Starting navgate v{}", env!("CARGO_PKG_VERSION"));

    let snapshot = load_policy(cli.policy.as_deref())?;
    let manifest = load_manifest(cli.handlers.as_deref())?;
    let cli_context = CliContext::new(snapshot, manifest);

    match dispatch(&cli, &cli_context) {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
