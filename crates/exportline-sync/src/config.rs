//! Sync run configuration

use std::path::PathBuf;

use crate::dates::{DateSelection, PartitionDate};

pub const DEFAULT_BUCKET: &str = "bd-thepuregrace-v1-dinamodb-core";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_PREFIX_BASE: &str = "exports/core";

/// Runtime configuration for a sync run
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Bucket name, recorded in the run summary
    pub bucket: String,
    /// Key prefix holding the date partitions, without trailing `/`
    pub prefix_base: String,
    /// Local mirror root (`raw_dir`)
    pub out_dir: PathBuf,
    pub selection: DateSelection,
    /// Parallel downloads within one partition
    pub workers: usize,
    pub max_retries: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            prefix_base: DEFAULT_PREFIX_BASE.to_string(),
            out_dir: PathBuf::from("./data/raw"),
            selection: DateSelection::default(),
            workers: default_workers(),
            max_retries: 3,
        }
    }
}

/// min(cpus, 8)
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(8)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("bucket must not be empty")]
    EmptyBucket,
    #[error("prefix base must not be empty")]
    EmptyPrefixBase,
    #[error("workers must be at least 1")]
    NoWorkers,
    #[error(transparent)]
    InvalidDate(#[from] exportline_ddb::InvalidDate),
}

impl SyncConfig {
    /// Reject unusable settings before any I/O happens
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::EmptyBucket);
        }
        if self.prefix().is_empty() {
            return Err(ConfigError::EmptyPrefixBase);
        }
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if let DateSelection::Explicit(date) = &self.selection {
            PartitionDate::parse(date)?;
        }
        Ok(())
    }

    /// Prefix base without surrounding slashes
    pub fn prefix(&self) -> &str {
        self.prefix_base.trim_matches('/')
    }
}
