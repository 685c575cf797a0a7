//! exportline - incremental export mirror and dashboard dataset builder
//!
//! Mirrors date-partitioned table exports from an object store and turns
//! them into curated Parquet tables plus a DuckDB database of dashboard views.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "exportline")]
#[command(about = "Incremental export mirror and dashboard dataset builder")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./exportline.toml or ~/.config/exportline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Read timeout in seconds for stall detection
    #[arg(long, global = true)]
    read_timeout: Option<u64>,

    /// Maximum retry attempts for transient failures
    #[arg(long, global = true)]
    max_retries: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Mirror new export partitions into the raw directory
    Sync(cmd::sync::SyncArgs),
    /// Rebuild curated tables and the dashboard database
    Build(cmd::build::BuildArgs),
    /// Sync, then build
    Run(cmd::run::RunArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(exportline_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug, progress bars show activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    exportline_core::init_logging(quiet, cli.debug, multi);

    let mut config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    // CLI overrides for transport settings
    if let Some(secs) = cli.read_timeout {
        config.sync.read_timeout = secs;
    }
    if let Some(n) = cli.max_retries {
        config.sync.max_retries = n;
    }
    exportline_core::set_http_config(exportline_core::HttpConfig {
        read_timeout: Duration::from_secs(config.sync.read_timeout),
        ..Default::default()
    });

    match cli.command {
        Command::Sync(args) => {
            exportline_core::install_signal_handlers()
                .context("Failed to install signal handlers")?;
            cmd::sync::run(args, &config, &progress).map(|_| ())
        }
        Command::Build(args) => cmd::build::run(args, &config, &progress).map(|_| ()),
        Command::Run(args) => {
            exportline_core::install_signal_handlers()
                .context("Failed to install signal handlers")?;
            cmd::run::run(args, &config, &progress)
        }
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            let source = match (&config.source.local_mirror, &config.source.endpoint) {
                (Some(dir), _) => format!("local mirror {}", dir.display()),
                (None, Some(endpoint)) => format!("{endpoint} (path-style)"),
                (None, None) => format!("s3 {}", config.source.region),
            };
            table.add_row(vec!["Source", &source]);
            table.add_row(vec!["Bucket", &config.source.bucket]);
            table.add_row(vec!["Prefix base", &config.source.prefix_base]);
            table.add_row(vec![
                "Raw directory",
                &config.paths.raw_dir.display().to_string(),
            ]);
            table.add_row(vec![
                "Curated directory",
                &config.paths.curated_dir.display().to_string(),
            ]);
            table.add_row(vec![
                "Database",
                &config.paths.db_path.display().to_string(),
            ]);
            table.add_row(vec!["Workers", &config.sync.workers.to_string()]);
            table.add_row(vec!["Max retries", &config.sync.max_retries.to_string()]);
            table.add_row(vec![
                "Read timeout",
                &format!("{}s", config.sync.read_timeout),
            ]);
            table.add_row(vec!["Link base URL", &config.dataset.link_base_url]);
            table.add_row(vec![
                "Compression level",
                &config.dataset.zstd_level.to_string(),
            ]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
