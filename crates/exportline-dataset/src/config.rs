use std::path::PathBuf;

use exportline_ddb::{DEFAULT_LINK_BASE_URL, PartitionDate};

/// Configuration for a dataset build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Local export mirror (the sync output directory)
    pub raw_dir: PathBuf,
    /// Key prefix holding the date partitions
    pub prefix_base: String,
    /// Only these partitions; empty = every local partition
    pub dates: Vec<PartitionDate>,
    /// Output directory for `<table>.parquet`
    pub curated_dir: PathBuf,
    /// DuckDB database file
    pub db_path: PathBuf,
    /// Prefix for donation link URLs
    pub link_base_url: String,
    pub zstd_level: i32,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("./data/raw"),
            prefix_base: "exports/core".to_string(),
            dates: Vec::new(),
            curated_dir: PathBuf::from("./data/curated"),
            db_path: PathBuf::from("./data/dashboard.duckdb"),
            link_base_url: DEFAULT_LINK_BASE_URL.to_string(),
            zstd_level: 3,
        }
    }
}
