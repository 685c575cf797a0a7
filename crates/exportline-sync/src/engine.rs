//! Incremental mirror of the export bucket
//!
//! Partitions are handled one after another in date order; the objects of a
//! partition are fetched on a bounded rayon pool. An object is skipped when a
//! local file of exactly the listed size already exists, so an interrupted
//! run is repaired by running again.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use exportline_core::{ProgressContext, is_shutdown_requested, retry_with_backoff};
use indicatif::ProgressBar;
use rayon::prelude::*;

use crate::config::SyncConfig;
use crate::dates::{self, PartitionDate, local_dates};
use crate::store::{ObjectEntry, ObjectStore};
use crate::summary::SyncSummary;

enum ObjectOutcome {
    Skipped,
    Downloaded(u64),
}

#[derive(Default)]
struct PartitionCounters {
    downloaded: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    bytes: AtomicU64,
}

/// Run one sync: resolve dates, mirror their objects, write `last_sync.json`.
pub fn run(
    config: &SyncConfig,
    store: &dyn ObjectStore,
    progress: &ProgressContext,
) -> Result<SyncSummary> {
    config.validate().context("Invalid sync configuration")?;
    let start = Instant::now();
    let prefix_base = config.prefix();

    fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("Failed to create {}", config.out_dir.display()))?;

    let local = local_dates(&config.out_dir, prefix_base)
        .with_context(|| format!("Failed to scan {}", config.out_dir.display()))?;

    let remote = if config.selection.is_explicit() {
        BTreeSet::new()
    } else {
        match remote_dates(store, prefix_base, config.max_retries) {
            Ok(remote) => remote,
            Err(e) => {
                let mut summary = SyncSummary::new(config, Vec::new());
                summary.elapsed = start.elapsed();
                summary.write(&config.out_dir)?;
                return Err(e.context(format!("Failed to list {}", store.describe())));
            }
        }
    };
    log::debug!("Local dates: {}, remote dates: {}", local.len(), remote.len());

    let dates = dates::resolve(&config.selection, &remote, &local)?;
    let mut summary = SyncSummary::new(config, dates.clone());

    if dates.is_empty() {
        log::info!("No new dates to sync from {}", store.describe());
    } else {
        log::info!(
            "Syncing {} date(s) from {} with {} workers",
            dates.len(),
            store.describe(),
            config.workers
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()
            .context("Failed to create thread pool")?;

        for date in &dates {
            if is_shutdown_requested() {
                summary.interrupted = true;
                break;
            }
            sync_partition(config, store, date, &pool, progress, &mut summary);
        }
        summary.interrupted |= is_shutdown_requested();
    }

    summary.finished_at = chrono::Utc::now();
    summary.elapsed = start.elapsed();
    let path = summary.write(&config.out_dir)?;
    log::info!("Wrote {}", path.display());
    summary.log();
    Ok(summary)
}

/// Date-shaped sub-prefixes of `<prefix_base>/`
fn remote_dates(
    store: &dyn ObjectStore,
    prefix_base: &str,
    max_retries: u32,
) -> Result<BTreeSet<PartitionDate>> {
    let prefixes = retry_with_backoff(prefix_base, max_retries, &ProgressBar::hidden(), || {
        store.list_prefixes(prefix_base)
    })?;
    Ok(prefixes
        .iter()
        .filter_map(|p| p.trim_end_matches('/').rsplit('/').next())
        .filter_map(|name| PartitionDate::parse(name).ok())
        .collect())
}

fn sync_partition(
    config: &SyncConfig,
    store: &dyn ObjectStore,
    date: &PartitionDate,
    pool: &rayon::ThreadPool,
    progress: &ProgressContext,
    summary: &mut SyncSummary,
) {
    let prefix = format!("{}/{date}/", config.prefix());
    let listed = retry_with_backoff(&prefix, config.max_retries, &ProgressBar::hidden(), || {
        store.list_objects(&prefix)
    });
    let objects: Vec<ObjectEntry> = match listed {
        Ok(objects) => objects.into_iter().filter(|o| !o.key.ends_with('/')).collect(),
        Err(e) => {
            log::error!("{date}: listing {prefix} failed: {e}");
            summary.failed_dates.push(date.clone());
            return;
        }
    };
    if objects.is_empty() {
        log::warn!("{date}: no objects under {prefix}");
        return;
    }
    log::info!("{date}: {} objects", objects.len());

    let pb = progress.partition_bar(date.as_str(), objects.len() as u64);
    let counters = PartitionCounters::default();

    pool.install(|| {
        objects.par_iter().for_each(|object| {
            if is_shutdown_requested() {
                return;
            }
            match sync_object(config, store, object, &pb) {
                Ok(ObjectOutcome::Skipped) => {
                    counters.skipped.fetch_add(1, Ordering::Relaxed);
                }
                Ok(ObjectOutcome::Downloaded(bytes)) => {
                    counters.downloaded.fetch_add(1, Ordering::Relaxed);
                    counters.bytes.fetch_add(bytes, Ordering::Relaxed);
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    log::error!("{}: {e:#}", object.key);
                }
            }
            pb.inc(1);
        });
    });
    pb.finish_and_clear();

    let downloaded = counters.downloaded.into_inner();
    let skipped = counters.skipped.into_inner();
    let failed = counters.failed.into_inner();
    log::info!("{date}: {downloaded} downloaded, {skipped} skipped, {failed} failed");

    summary.downloaded_files += downloaded;
    summary.skipped_files += skipped;
    summary.failed_files += failed;
    summary.downloaded_bytes += counters.bytes.into_inner();
    summary.dates_downloaded.push(date.clone());
}

fn sync_object(
    config: &SyncConfig,
    store: &dyn ObjectStore,
    object: &ObjectEntry,
    pb: &ProgressBar,
) -> Result<ObjectOutcome> {
    let dest = local_path(&config.out_dir, &object.key)?;

    if let Ok(meta) = fs::metadata(&dest) {
        if meta.is_file() && meta.len() == object.size {
            log::debug!("skip {} ({} bytes)", object.key, object.size);
            return Ok(ObjectOutcome::Skipped);
        }
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    pb.set_message(object.key.clone());
    let bytes = retry_with_backoff(&object.key, config.max_retries, pb, || {
        store.download(&object.key, &dest)
    })
    .context("download failed")?;

    if bytes != object.size {
        log::warn!(
            "{}: listed {} bytes but received {bytes}; will retry next run",
            object.key,
            object.size
        );
    }
    log::debug!("get {} ({bytes} bytes)", object.key);
    Ok(ObjectOutcome::Downloaded(bytes))
}

/// `out_dir` joined with every `/` segment of `key`
fn local_path(out_dir: &Path, key: &str) -> Result<PathBuf> {
    let mut path = out_dir.to_path_buf();
    for segment in key.split('/').filter(|s| !s.is_empty() && *s != ".") {
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => path.push(segment),
            _ => bail!("refusing key with unsafe path segment {segment:?}"),
        }
    }
    Ok(path)
}
