//! Run subcommand - sync, then rebuild the dataset from the whole mirror

use anyhow::{Result, bail};
use clap::Args;
use exportline_core::{SharedProgress, is_shutdown_requested};

use super::build::{self, OutputArgs};
use super::sync::{self, SyncArgs};
use crate::config::Config;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub sync: SyncArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn run(args: RunArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    log::info!("=== Stage 1/2: sync ===");
    let summary = sync::run(args.sync.clone(), config, progress)?;

    if summary.interrupted || is_shutdown_requested() {
        bail!("Interrupted during sync; dataset not rebuilt");
    }

    // Build reads every local partition, not only the ones fetched above
    log::info!("=== Stage 2/2: build ===");
    let build_config = build::build_config(
        config,
        args.sync.out_dir,
        args.sync.prefix_base,
        &args.output,
        Vec::new(),
    );
    build::execute(&build_config, progress)?;
    Ok(())
}
