//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use exportline_ddb::DEFAULT_LINK_BASE_URL;
use exportline_sync::config::{
    DEFAULT_BUCKET, DEFAULT_PREFIX_BASE, DEFAULT_REGION, default_workers,
};

/// Global configuration for exportline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub paths: PathsConfig,
    pub sync: SyncSettings,
    pub dataset: DatasetConfig,
}

/// Where the exports live
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub bucket: String,
    pub region: String,
    pub prefix_base: String,
    /// S3-compatible endpoint; switches to path-style URLs
    #[serde(deserialize_with = "deserialize_env_var")]
    pub endpoint: Option<String>,
    /// Read exports from this directory instead of the bucket
    pub local_mirror: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            region: DEFAULT_REGION.to_string(),
            prefix_base: DEFAULT_PREFIX_BASE.to_string(),
            endpoint: None,
            local_mirror: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub raw_dir: PathBuf,
    pub curated_dir: PathBuf,
    pub db_path: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("./data/raw"),
            curated_dir: PathBuf::from("./data/curated"),
            db_path: PathBuf::from("./data/dashboard.duckdb"),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub workers: usize,
    pub max_retries: u32,
    /// Seconds without data before a transfer counts as stalled
    pub read_timeout: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_retries: 3,
            read_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub link_base_url: String,
    pub zstd_level: i32,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            link_base_url: DEFAULT_LINK_BASE_URL.to_string(),
            zstd_level: 3,
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./exportline.toml (current directory)
    /// 2. the platform config dir, e.g. ~/.config/exportline/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("exportline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "exportline") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
