//! Build subcommand - curated Parquet tables and the dashboard database

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use exportline_core::{SharedProgress, fmt_num};
use exportline_dataset::{BuildConfig, BuildSummary};
use exportline_ddb::PartitionDate;

use super::{fmt_dates, print_summary};
use crate::config::Config;

#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Directory for the curated Parquet tables
    #[arg(long)]
    pub curated_dir: Option<PathBuf>,

    /// DuckDB database file
    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Local mirror root to read exports from
    #[arg(long)]
    pub raw_dir: Option<PathBuf>,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Only read these partitions (repeatable; default: every local partition)
    #[arg(long = "date", value_name = "YYYY-MM-DD", value_parser = PartitionDate::parse)]
    pub dates: Vec<PartitionDate>,
}

/// Builder settings from file config plus overrides
pub fn build_config(
    config: &Config,
    raw_dir: Option<PathBuf>,
    prefix_base: Option<String>,
    output: &OutputArgs,
    dates: Vec<PartitionDate>,
) -> BuildConfig {
    BuildConfig {
        raw_dir: raw_dir.unwrap_or_else(|| config.paths.raw_dir.clone()),
        prefix_base: prefix_base.unwrap_or_else(|| config.source.prefix_base.clone()),
        dates,
        curated_dir: output
            .curated_dir
            .clone()
            .unwrap_or_else(|| config.paths.curated_dir.clone()),
        db_path: output
            .db_path
            .clone()
            .unwrap_or_else(|| config.paths.db_path.clone()),
        link_base_url: config.dataset.link_base_url.clone(),
        zstd_level: config.dataset.zstd_level,
    }
}

pub fn run(args: BuildArgs, config: &Config, progress: &SharedProgress) -> Result<BuildSummary> {
    let build_config = build_config(config, args.raw_dir, None, &args.output, args.dates);
    execute(&build_config, progress)
}

pub(crate) fn execute(build_config: &BuildConfig, progress: &SharedProgress) -> Result<BuildSummary> {
    log::info!("Building dataset");
    log::info!("  Input: {}", build_config.raw_dir.display());
    log::info!("  Tables: {}", build_config.curated_dir.display());
    log::info!("  Database: {}", build_config.db_path.display());

    let status = progress.stage_line("build");
    status.set_message(format!("reading {}", build_config.raw_dir.display()));
    let result = exportline_dataset::run(build_config);
    status.finish_and_clear();
    let summary = result?;

    let mut rows: Vec<(&str, String)> = vec![("Dates", fmt_dates(&summary.dates))];
    for (kind, n) in &summary.rows {
        rows.push((kind.table_name(), fmt_num(*n)));
    }
    let r = &summary.reader;
    rows.extend([
        (
            "Items",
            format!(
                "{} from {} files ({} unclassified)",
                fmt_num(r.items as usize),
                r.files,
                fmt_num(summary.unclassified as usize)
            ),
        ),
        (
            "Skipped",
            format!(
                "{} lines, {} values, {} files",
                r.malformed_lines, r.malformed_values, r.failed_files
            ),
        ),
        ("Database", summary.db_path.display().to_string()),
        ("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())),
    ]);
    print_summary("Build", &rows);

    Ok(summary)
}
