//! Streaming reader over locally mirrored export partitions
//!
//! Layout: `<raw_root>/<prefix_base>/<date>/AWSDynamoDB/<export-id>/data/*.json.gz`.
//! Each data file is gzip'd JSON lines, one `{"Item": {...}}` per line.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use flate2::read::MultiGzDecoder;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::partition::{PartitionDate, partition_dir};
use crate::value::{RawRecord, decode_item};

/// Data files below a partition directory
pub const DATA_FILE_GLOB: &str = "AWSDynamoDB/*/data/*.json.gz";

/// Live counters, shared with whoever holds the reader
#[derive(Debug, Default)]
pub struct ReaderCounters {
    files: AtomicU64,
    failed_files: AtomicU64,
    lines: AtomicU64,
    items: AtomicU64,
    malformed_lines: AtomicU64,
    malformed_values: AtomicU64,
}

impl ReaderCounters {
    pub fn snapshot(&self) -> ReaderStats {
        ReaderStats {
            files: self.files.load(Ordering::Relaxed),
            failed_files: self.failed_files.load(Ordering::Relaxed),
            lines: self.lines.load(Ordering::Relaxed),
            items: self.items.load(Ordering::Relaxed),
            malformed_lines: self.malformed_lines.load(Ordering::Relaxed),
            malformed_values: self.malformed_values.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    pub files: u64,
    pub failed_files: u64,
    pub lines: u64,
    pub items: u64,
    pub malformed_lines: u64,
    pub malformed_values: u64,
}

#[derive(Deserialize)]
struct ExportLine {
    #[serde(rename = "Item")]
    item: Option<Map<String, Value>>,
}

pub struct ExportReader {
    raw_root: PathBuf,
    prefix_base: String,
    dates: Vec<PartitionDate>,
    counters: Arc<ReaderCounters>,
}

impl ExportReader {
    pub fn new(raw_root: impl Into<PathBuf>, prefix_base: &str, dates: Vec<PartitionDate>) -> Self {
        Self {
            raw_root: raw_root.into(),
            prefix_base: prefix_base.to_string(),
            dates,
            counters: Arc::new(ReaderCounters::default()),
        }
    }

    pub fn counters(&self) -> Arc<ReaderCounters> {
        Arc::clone(&self.counters)
    }

    pub fn stats(&self) -> ReaderStats {
        self.counters.snapshot()
    }

    /// Data files for all selected dates, sorted within each date.
    pub fn data_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for date in &self.dates {
            let dir = partition_dir(&self.raw_root, &self.prefix_base, date);
            let pattern = dir.join(DATA_FILE_GLOB);
            let Some(pattern) = pattern.to_str() else {
                log::warn!("Skipping non-UTF-8 partition path {}", dir.display());
                continue;
            };
            let mut found: Vec<PathBuf> = match glob::glob(pattern) {
                Ok(paths) => paths.filter_map(Result::ok).collect(),
                Err(e) => {
                    log::warn!("Bad glob pattern {pattern}: {e}");
                    continue;
                }
            };
            if found.is_empty() {
                log::warn!("No export data files under {}", dir.display());
            }
            found.sort();
            files.extend(found);
        }
        files
    }

    /// Lazily stream every item of the selected partitions.
    ///
    /// Files are enumerated on each call.
    pub fn records(&self) -> Records {
        Records {
            files: self.data_files().into(),
            current: None,
            counters: Arc::clone(&self.counters),
        }
    }
}

struct OpenFile {
    path: PathBuf,
    reader: BufReader<MultiGzDecoder<File>>,
    line_no: u64,
    buf: Vec<u8>,
}

/// Iterator returned by [`ExportReader::records`]
pub struct Records {
    files: VecDeque<PathBuf>,
    current: Option<OpenFile>,
    counters: Arc<ReaderCounters>,
}

impl Records {
    fn open_next(&mut self) -> bool {
        while let Some(path) = self.files.pop_front() {
            match File::open(&path) {
                Ok(file) => {
                    log::debug!("Reading {}", path.display());
                    ReaderCounters::bump(&self.counters.files);
                    self.current = Some(OpenFile {
                        reader: BufReader::new(MultiGzDecoder::new(file)),
                        path,
                        line_no: 0,
                        buf: Vec::new(),
                    });
                    return true;
                }
                Err(e) => {
                    log::error!("Cannot open {}: {e}", path.display());
                    ReaderCounters::bump(&self.counters.failed_files);
                }
            }
        }
        false
    }

    fn parse_line(counters: &ReaderCounters, path: &Path, line_no: u64, line: &[u8]) -> Option<RawRecord> {
        let line = line.trim_ascii();
        if line.is_empty() {
            return None;
        }
        ReaderCounters::bump(&counters.lines);

        let parsed: ExportLine = match serde_json::from_slice(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("{}:{line_no}: malformed line: {e}", path.display());
                ReaderCounters::bump(&counters.malformed_lines);
                return None;
            }
        };
        let item = parsed.item?;

        ReaderCounters::bump(&counters.items);
        Some(decode_item(&item, |name, e| {
            log::debug!("{}:{line_no}: dropping attribute {name}: {e}", path.display());
            ReaderCounters::bump(&counters.malformed_values);
        }))
    }
}

impl Iterator for Records {
    type Item = RawRecord;

    fn next(&mut self) -> Option<RawRecord> {
        loop {
            if self.current.is_none() && !self.open_next() {
                return None;
            }
            let Some(open) = self.current.as_mut() else {
                continue;
            };

            open.buf.clear();
            match open.reader.read_until(b'\n', &mut open.buf) {
                Ok(0) => {
                    self.current = None;
                }
                Ok(_) => {
                    open.line_no += 1;
                    if let Some(record) =
                        Self::parse_line(&self.counters, &open.path, open.line_no, &open.buf)
                    {
                        return Some(record);
                    }
                }
                Err(e) => {
                    log::error!(
                        "{}: read failed after line {}: {e}",
                        open.path.display(),
                        open.line_no
                    );
                    ReaderCounters::bump(&self.counters.failed_files);
                    self.current = None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;

    const PREFIX: &str = "exports/core";

    fn write_export(root: &Path, date: &str, name: &str, lines: &[&str]) {
        let dir = root
            .join(PREFIX)
            .join(date)
            .join("AWSDynamoDB/01700000000000-abcd/data");
        fs::create_dir_all(&dir).unwrap();
        let mut enc = GzEncoder::new(fs::File::create(dir.join(name)).unwrap(), Compression::default());
        for line in lines {
            writeln!(enc, "{line}").unwrap();
        }
        enc.finish().unwrap();
    }

    fn date(s: &str) -> PartitionDate {
        PartitionDate::parse(s).unwrap()
    }

    #[test]
    fn reads_items_across_dates_in_order() {
        let dir = TempDir::new().unwrap();
        write_export(dir.path(), "2024-01-01", "b.json.gz", &[
            r#"{"Item":{"PK":{"S":"USER#2"},"SK":{"S":"PROFILE"}}}"#,
        ]);
        write_export(dir.path(), "2024-01-01", "a.json.gz", &[
            r#"{"Item":{"PK":{"S":"USER#1"},"SK":{"S":"PROFILE"}}}"#,
        ]);
        write_export(dir.path(), "2024-01-02", "a.json.gz", &[
            r#"{"Item":{"PK":{"S":"USER#3"},"SK":{"S":"PROFILE"}}}"#,
        ]);

        let reader = ExportReader::new(dir.path(), PREFIX, vec![date("2024-01-01"), date("2024-01-02")]);
        let pks: Vec<String> = reader
            .records()
            .map(|r| r.pk().unwrap().to_string())
            .collect();
        assert_eq!(pks, ["USER#1", "USER#2", "USER#3"]);
        assert_eq!(reader.stats().files, 3);
        assert_eq!(reader.stats().items, 3);
    }

    #[test]
    fn skips_bad_lines_and_keeps_going() {
        let dir = TempDir::new().unwrap();
        write_export(dir.path(), "2024-01-01", "a.json.gz", &[
            r#"{"Item":{"PK":{"S":"TX#1"},"SK":{"S":"STATUS"}}}"#,
            "{not json",
            "",
            r#"{"Metadata":{"count":2}}"#,
            r#"{"Item":"oops"}"#,
            r#"{"Item":{"PK":{"S":"TX#2"},"SK":{"S":"STATUS"},"blob":{"B":"AA=="}}}"#,
        ]);

        let reader = ExportReader::new(dir.path(), PREFIX, vec![date("2024-01-01")]);
        let records: Vec<_> = reader.records().collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].pk(), Some("TX#2"));
        assert!(records[1].get("blob").is_none());

        let stats = reader.stats();
        assert_eq!(stats.malformed_lines, 2);
        assert_eq!(stats.malformed_values, 1);
        assert_eq!(stats.lines, 5);
    }

    #[test]
    fn corrupt_file_is_counted_and_skipped() {
        let dir = TempDir::new().unwrap();
        write_export(dir.path(), "2024-01-01", "b.json.gz", &[
            r#"{"Item":{"PK":{"S":"USER#1"},"SK":{"S":"PROFILE"}}}"#,
        ]);
        let data = dir
            .path()
            .join(PREFIX)
            .join("2024-01-01/AWSDynamoDB/01700000000000-abcd/data");
        fs::write(data.join("a.json.gz"), b"definitely not gzip").unwrap();

        let reader = ExportReader::new(dir.path(), PREFIX, vec![date("2024-01-01")]);
        assert_eq!(reader.records().count(), 1);
        assert_eq!(reader.stats().failed_files, 1);
    }

    #[test]
    fn records_restart_from_disk() {
        let dir = TempDir::new().unwrap();
        write_export(dir.path(), "2024-01-01", "a.json.gz", &[
            r#"{"Item":{"PK":{"S":"USER#1"},"SK":{"S":"PROFILE"}}}"#,
        ]);
        let reader = ExportReader::new(dir.path(), PREFIX, vec![date("2024-01-01")]);
        assert_eq!(reader.records().count(), 1);

        write_export(dir.path(), "2024-01-01", "b.json.gz", &[
            r#"{"Item":{"PK":{"S":"USER#2"},"SK":{"S":"PROFILE"}}}"#,
        ]);
        assert_eq!(reader.records().count(), 2);
    }

    #[test]
    fn missing_partition_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let reader = ExportReader::new(dir.path(), PREFIX, vec![date("2030-01-01")]);
        assert_eq!(reader.records().count(), 0);
    }
}
