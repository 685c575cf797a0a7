//! Machine-readable record of a sync run (`last_sync.json`)

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::SyncConfig;
use crate::dates::PartitionDate;

pub const SUMMARY_FILE: &str = "last_sync.json";

#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub bucket: String,
    pub prefix_base: String,
    pub dates_requested: Vec<PartitionDate>,
    pub dates_downloaded: Vec<PartitionDate>,
    /// Dates whose object listing failed; nothing was fetched for them
    pub failed_dates: Vec<PartitionDate>,
    pub out_dir: String,
    pub downloaded_files: u64,
    pub skipped_files: u64,
    pub failed_files: u64,
    pub downloaded_bytes: u64,
    pub finished_at: DateTime<Utc>,
    #[serde(skip)]
    pub interrupted: bool,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl SyncSummary {
    pub fn new(config: &SyncConfig, dates_requested: Vec<PartitionDate>) -> Self {
        let out_dir = std::path::absolute(&config.out_dir).unwrap_or_else(|_| config.out_dir.clone());
        Self {
            bucket: config.bucket.clone(),
            prefix_base: config.prefix().to_string(),
            dates_requested,
            dates_downloaded: Vec::new(),
            failed_dates: Vec::new(),
            out_dir: out_dir.display().to_string(),
            downloaded_files: 0,
            skipped_files: 0,
            failed_files: 0,
            downloaded_bytes: 0,
            finished_at: Utc::now(),
            interrupted: false,
            elapsed: Duration::ZERO,
        }
    }

    /// Write `<out_dir>/last_sync.json` (pretty, replacing the previous one)
    pub fn write(&self, out_dir: &Path) -> Result<PathBuf> {
        let path = out_dir.join(SUMMARY_FILE);
        let tmp = out_dir.join(format!("{SUMMARY_FILE}.tmp"));
        let json = serde_json::to_string_pretty(self).context("Failed to serialize sync summary")?;
        fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn log(&self) {
        log::info!("=== Sync Summary ===");
        log::info!(
            "Dates: {} requested, {} with objects",
            self.dates_requested.len(),
            self.dates_downloaded.len()
        );
        log::info!(
            "Files: {} downloaded, {} skipped, {} failed",
            self.downloaded_files,
            self.skipped_files,
            self.failed_files
        );
        log::info!(
            "Bytes: {:.1} MB in {:.1}s",
            self.downloaded_bytes as f64 / 1_048_576.0,
            self.elapsed.as_secs_f64()
        );
        if !self.failed_dates.is_empty() {
            let dates: Vec<&str> = self.failed_dates.iter().map(|d| d.as_str()).collect();
            log::warn!("Listing failed for: {}", dates.join(", "));
        }
        if self.interrupted {
            log::warn!("Run was interrupted; re-run to fetch the rest");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_expected_keys() {
        let dir = TempDir::new().unwrap();
        let config = SyncConfig {
            out_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let date = PartitionDate::parse("2024-01-02").unwrap();
        let mut summary = SyncSummary::new(&config, vec![date.clone()]);
        summary.dates_downloaded.push(date);
        summary.downloaded_files = 2;
        summary.downloaded_bytes = 300;

        let path = summary.write(dir.path()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();

        let mut keys: Vec<&str> = v.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(
            keys,
            [
                "bucket",
                "dates_downloaded",
                "dates_requested",
                "downloaded_bytes",
                "downloaded_files",
                "failed_dates",
                "failed_files",
                "finished_at",
                "out_dir",
                "prefix_base",
                "skipped_files"
            ]
        );
        assert_eq!(v["dates_requested"], serde_json::json!(["2024-01-02"]));
        assert_eq!(v["prefix_base"], "exports/core");
        assert_eq!(v["failed_dates"], serde_json::json!([]));
        assert!(v["finished_at"].as_str().unwrap().ends_with('Z'));
        assert!(!dir.path().join("last_sync.json.tmp").exists());
    }
}
