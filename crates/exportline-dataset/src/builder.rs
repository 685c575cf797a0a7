//! Export partitions → curated Parquet tables → DuckDB tables and views

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use duckdb::Connection;
use exportline_core::{Accumulator, ParquetSink, cleanup_tmp_files, fmt_num};
use exportline_ddb::schema;
use exportline_ddb::transform::{
    AccessAccumulator, DonationAccumulator, DonationLinkAccumulator, PaymentAccumulator,
    UserAccumulator,
};
use exportline_ddb::{
    Classifier, EntityKind, EntityRecord, ExportReader, PartitionDate, ReaderStats, local_dates,
};

use crate::config::BuildConfig;
use crate::sql;

/// Log a progress line every this many records
const PROGRESS_EVERY: u64 = 100_000;

#[derive(Debug)]
pub struct BuildSummary {
    pub dates: Vec<PartitionDate>,
    /// Rows written per table, in table order
    pub rows: Vec<(EntityKind, usize)>,
    pub reader: ReaderStats,
    /// Items that matched no entity pattern
    pub unclassified: u64,
    pub db_path: PathBuf,
    pub elapsed: Duration,
}

impl BuildSummary {
    pub fn rows_for(&self, kind: EntityKind) -> usize {
        self.rows
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(0, |(_, n)| *n)
    }

    pub fn total_rows(&self) -> usize {
        self.rows.iter().map(|(_, n)| n).sum()
    }
}

/// One accumulator feeding one Parquet sink
struct TableWriter<A: Accumulator> {
    kind: EntityKind,
    acc: A,
    sink: ParquetSink,
}

impl<A: Accumulator> TableWriter<A> {
    fn new(kind: EntityKind, acc: A, config: &BuildConfig) -> Result<Self> {
        let sink = ParquetSink::new(
            kind.table_name(),
            &config.curated_dir,
            schema::for_kind(kind),
            config.zstd_level,
        )
        .with_context(|| format!("Failed to create {kind} sink"))?;
        Ok(Self { kind, acc, sink })
    }

    fn push(&mut self, row: A::Row) -> Result<()> {
        self.acc.push(row);
        if self.acc.is_full() {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let batch = self
            .acc
            .take_batch()
            .with_context(|| format!("Failed to build {} batch", self.kind))?;
        self.sink
            .write_batch(&batch)
            .with_context(|| format!("Failed to write {} batch", self.kind))
    }

    fn finish(mut self) -> Result<(EntityKind, usize)> {
        if !self.acc.is_empty() {
            self.flush()?;
        }
        let path = self.sink.final_path().to_path_buf();
        let rows = self
            .sink
            .finalize()
            .with_context(|| format!("Failed to finalize {}", path.display()))?;
        log::info!("Wrote {} ({} rows)", path.display(), fmt_num(rows));
        Ok((self.kind, rows))
    }
}

struct EntityTables {
    users: TableWriter<UserAccumulator>,
    donations: TableWriter<DonationAccumulator>,
    donation_links: TableWriter<DonationLinkAccumulator>,
    accesses: TableWriter<AccessAccumulator>,
    payments: TableWriter<PaymentAccumulator>,
}

impl EntityTables {
    fn new(config: &BuildConfig) -> Result<Self> {
        Ok(Self {
            users: TableWriter::new(EntityKind::User, UserAccumulator::new(), config)?,
            donations: TableWriter::new(EntityKind::Donation, DonationAccumulator::new(), config)?,
            donation_links: TableWriter::new(
                EntityKind::DonationLink,
                DonationLinkAccumulator::new(),
                config,
            )?,
            accesses: TableWriter::new(EntityKind::Access, AccessAccumulator::new(), config)?,
            payments: TableWriter::new(EntityKind::Payment, PaymentAccumulator::new(), config)?,
        })
    }

    fn push(&mut self, entity: EntityRecord) -> Result<()> {
        match entity {
            EntityRecord::User(row) => self.users.push(row),
            EntityRecord::Donation(row) => self.donations.push(row),
            EntityRecord::DonationLink(row) => self.donation_links.push(row),
            EntityRecord::Access(row) => self.accesses.push(row),
            EntityRecord::Payment(row) => self.payments.push(row),
        }
    }

    fn finish(self) -> Result<Vec<(EntityKind, usize)>> {
        Ok(vec![
            self.users.finish()?,
            self.donations.finish()?,
            self.donation_links.finish()?,
            self.accesses.finish()?,
            self.payments.finish()?,
        ])
    }
}

/// Rebuild the curated tables and the dashboard database from scratch.
pub fn run(config: &BuildConfig) -> Result<BuildSummary> {
    let start = Instant::now();
    let prefix_base = config.prefix_base.trim_matches('/');

    if !config.raw_dir.is_dir() {
        bail!("raw directory not found: {}", config.raw_dir.display());
    }

    let dates: Vec<PartitionDate> = if config.dates.is_empty() {
        local_dates(&config.raw_dir, prefix_base)
            .with_context(|| format!("Failed to scan {}", config.raw_dir.display()))?
            .into_iter()
            .collect()
    } else {
        let mut dates = config.dates.clone();
        dates.sort();
        dates.dedup();
        dates
    };
    if dates.is_empty() {
        log::warn!(
            "No partitions under {}; writing empty tables",
            config.raw_dir.join(prefix_base).display()
        );
    } else {
        log::info!("Building dataset from {} partition(s)", dates.len());
    }

    std::fs::create_dir_all(&config.curated_dir).with_context(|| {
        format!("Failed to create {}", config.curated_dir.display())
    })?;
    cleanup_tmp_files(&config.curated_dir).context("Failed to clean curated dir")?;

    // Stage 1: classify every exported item into per-entity Parquet tables
    let reader = ExportReader::new(&config.raw_dir, prefix_base, dates.clone());
    let classifier = Classifier::new(config.link_base_url.as_str());
    let mut tables = EntityTables::new(config)?;
    let mut seen = 0u64;
    let mut unclassified = 0u64;

    for record in reader.records() {
        seen += 1;
        match classifier.classify(&record) {
            Some(entity) => tables.push(entity)?,
            None => unclassified += 1,
        }
        if seen % PROGRESS_EVERY == 0 {
            log::info!("{} items read", fmt_num(seen as usize));
        }
    }
    let rows = tables.finish()?;
    let reader_stats = reader.stats();

    // Stage 2: load tables, then views over them
    build_database(&config.db_path, &config.curated_dir)?;

    let summary = BuildSummary {
        dates,
        rows,
        reader: reader_stats,
        unclassified,
        db_path: config.db_path.clone(),
        elapsed: start.elapsed(),
    };
    log_summary(&summary);
    Ok(summary)
}

fn build_database(db_path: &Path, curated_dir: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open DuckDB at {}", db_path.display()))?;

    for kind in EntityKind::ALL {
        let table = kind.table_name();
        let parquet = curated_dir.join(format!("{table}.parquet"));
        conn.execute_batch(&sql::create_table(table, &parquet))
            .with_context(|| format!("Failed to load table {table}"))?;
    }
    for (name, stmt) in sql::VIEWS {
        conn.execute_batch(stmt)
            .with_context(|| format!("Failed to create view {name}"))?;
    }
    log::info!(
        "Wrote {} ({} tables, {} views)",
        db_path.display(),
        EntityKind::ALL.len(),
        sql::VIEWS.len()
    );
    Ok(())
}

fn log_summary(summary: &BuildSummary) {
    log::info!("=== Build Summary ===");
    for (kind, rows) in &summary.rows {
        log::info!("{kind}: {}", fmt_num(*rows));
    }
    let r = &summary.reader;
    log::info!(
        "Read {} files, {} items ({} unclassified)",
        r.files,
        fmt_num(r.items as usize),
        fmt_num(summary.unclassified as usize)
    );
    if r.malformed_lines > 0 || r.malformed_values > 0 || r.failed_files > 0 {
        log::warn!(
            "Skipped {} malformed lines, {} malformed values, {} unreadable files",
            r.malformed_lines,
            r.malformed_values,
            r.failed_files
        );
    }
    log::info!("Time: {:.1}s", summary.elapsed.as_secs_f64());
}
