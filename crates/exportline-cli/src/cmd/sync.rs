//! Sync subcommand - mirror new export partitions from the bucket

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use exportline_core::{SharedProgress, fmt_num};
use exportline_sync::{DateSelection, LocalStore, ObjectStore, S3Store, SyncConfig, SyncSummary};

use super::{fmt_dates, print_summary};
use crate::config::Config;

/// Which partitions to fetch
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Sync exactly this partition (YYYY-MM-DD)
    #[arg(long, value_name = "YYYY-MM-DD", conflicts_with_all = ["all_dates", "from_last"])]
    pub date: Option<String>,

    /// Sync every partition in the bucket
    #[arg(long, conflicts_with = "from_last")]
    pub all_dates: bool,

    /// Sync partitions newer than the latest local one (default)
    #[arg(long)]
    pub from_last: bool,
}

impl SelectionArgs {
    pub fn selection(&self) -> DateSelection {
        if let Some(date) = &self.date {
            DateSelection::Explicit(date.clone())
        } else if self.all_dates {
            DateSelection::AllDates
        } else {
            DateSelection::FromLast
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Bucket holding the exports
    #[arg(long)]
    pub bucket: Option<String>,

    /// Key prefix above the date partitions
    #[arg(long)]
    pub prefix_base: Option<String>,

    /// Bucket region
    #[arg(long)]
    pub region: Option<String>,

    /// Local mirror root (raw directory)
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Parallel downloads per partition
    #[arg(long)]
    pub workers: Option<usize>,
}

impl SyncArgs {
    /// File config with CLI overrides applied
    pub fn to_config(&self, config: &Config) -> SyncConfig {
        SyncConfig {
            bucket: self
                .bucket
                .clone()
                .unwrap_or_else(|| config.source.bucket.clone()),
            prefix_base: self
                .prefix_base
                .clone()
                .unwrap_or_else(|| config.source.prefix_base.clone()),
            out_dir: self
                .out_dir
                .clone()
                .unwrap_or_else(|| config.paths.raw_dir.clone()),
            selection: self.selection.selection(),
            workers: self.workers.unwrap_or(config.sync.workers),
            max_retries: config.sync.max_retries,
        }
    }
}

/// The configured object store: a local mirror, a custom endpoint or S3
fn open_store(args: &SyncArgs, config: &Config, bucket: &str) -> Result<Box<dyn ObjectStore>> {
    if let Some(root) = &config.source.local_mirror {
        return Ok(Box::new(LocalStore::new(root)));
    }
    let store = match &config.source.endpoint {
        Some(endpoint) => S3Store::with_endpoint(bucket, endpoint)?,
        None => {
            let region = args.region.as_deref().unwrap_or(&config.source.region);
            S3Store::new(bucket, region)?
        }
    };
    Ok(Box::new(store))
}

pub fn run(args: SyncArgs, config: &Config, progress: &SharedProgress) -> Result<SyncSummary> {
    let sync_config = args.to_config(config);
    let store = open_store(&args, config, &sync_config.bucket)
        .context("Failed to configure object store")?;

    log::info!("Syncing from {}", store.describe());
    log::info!("  Output: {}", sync_config.out_dir.display());
    log::info!("  Selection: {:?}", sync_config.selection);

    let summary = exportline_sync::run(&sync_config, store.as_ref(), progress)?;

    print_summary(
        "Sync",
        &[
            ("Requested", fmt_dates(&summary.dates_requested)),
            ("Downloaded dates", fmt_dates(&summary.dates_downloaded)),
            ("Failed dates", fmt_dates(&summary.failed_dates)),
            (
                "Files",
                format!(
                    "{} downloaded, {} skipped, {} failed",
                    fmt_num(summary.downloaded_files as usize),
                    fmt_num(summary.skipped_files as usize),
                    summary.failed_files
                ),
            ),
            ("Bytes", fmt_num(summary.downloaded_bytes as usize)),
            ("Output", summary.out_dir.clone()),
            ("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())),
        ],
    );

    if !summary.failed_dates.is_empty() {
        log::warn!(
            "{} date(s) could not be listed; the next run retries them",
            summary.failed_dates.len()
        );
    }
    if summary.failed_files > 0 {
        log::warn!(
            "{} object(s) failed; the next run retries them",
            summary.failed_files
        );
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(selection: SelectionArgs) -> SyncArgs {
        SyncArgs {
            selection,
            bucket: None,
            prefix_base: None,
            region: None,
            out_dir: None,
            workers: None,
        }
    }

    #[test]
    fn selection_defaults_to_from_last() {
        assert_eq!(SelectionArgs::default().selection(), DateSelection::FromLast);
        let all = SelectionArgs {
            all_dates: true,
            ..Default::default()
        };
        assert_eq!(all.selection(), DateSelection::AllDates);
        let one = SelectionArgs {
            date: Some("2024-01-02".into()),
            ..Default::default()
        };
        assert_eq!(one.selection(), DateSelection::Explicit("2024-01-02".into()));
    }

    #[test]
    fn cli_overrides_file_config() {
        let mut config = Config::default();
        config.sync.workers = 2;
        config.paths.raw_dir = PathBuf::from("/srv/raw");

        let mut a = args(SelectionArgs::default());
        let merged = a.to_config(&config);
        assert_eq!(merged.workers, 2);
        assert_eq!(merged.out_dir, PathBuf::from("/srv/raw"));
        assert_eq!(merged.bucket, config.source.bucket);

        a.workers = Some(6);
        a.bucket = Some("other".into());
        let merged = a.to_config(&config);
        assert_eq!(merged.workers, 6);
        assert_eq!(merged.bucket, "other");
    }

    #[test]
    fn local_mirror_wins_over_s3() {
        let mut config = Config::default();
        config.source.local_mirror = Some(PathBuf::from("/mnt/exports"));
        let store = open_store(&args(SelectionArgs::default()), &config, "b").unwrap();
        assert!(store.describe().contains("/mnt/exports"));
    }
}
