//! Date partitions of the export layout
//!
//! Exports land under `<prefix_base>/<YYYY-MM-DD>/`, both in the bucket and
//! in the local mirror. A partition name is only shape-checked: the export
//! job names directories, so calendar validity is its concern.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date {0:?}, expected YYYY-MM-DD")]
pub struct InvalidDate(pub String);

/// A `YYYY-MM-DD` partition name. Ordering is lexicographic, which is
/// chronological for this shape.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionDate(String);

impl PartitionDate {
    pub fn parse(s: &str) -> Result<Self, InvalidDate> {
        if is_date_shape(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidDate(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl serde::Serialize for PartitionDate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// `\d{4}-\d{2}-\d{2}` and nothing else
pub fn is_date_shape(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && b.iter().enumerate().all(|(i, c)| match i {
            4 | 7 => *c == b'-',
            _ => c.is_ascii_digit(),
        })
}

/// `<root>/<prefix_base>`, with the prefix split on `/` so it works on any platform
pub fn prefix_dir(root: &Path, prefix_base: &str) -> PathBuf {
    let mut dir = root.to_path_buf();
    for segment in prefix_base.split('/').filter(|s| !s.is_empty()) {
        dir.push(segment);
    }
    dir
}

/// `<root>/<prefix_base>/<date>`
pub fn partition_dir(root: &Path, prefix_base: &str, date: &PartitionDate) -> PathBuf {
    prefix_dir(root, prefix_base).join(date.as_str())
}

/// Date-shaped directories present under `<root>/<prefix_base>/`.
///
/// A missing prefix directory means no local dates yet.
pub fn local_dates(root: &Path, prefix_base: &str) -> io::Result<BTreeSet<PartitionDate>> {
    let dir = prefix_dir(root, prefix_base);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(e) => return Err(e),
    };

    let mut dates = BTreeSet::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(date) = entry
            .file_name()
            .to_str()
            .and_then(|name| PartitionDate::parse(name).ok())
        {
            dates.insert(date);
        }
    }
    Ok(dates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn shape_check_only() {
        assert!(PartitionDate::parse("2024-01-31").is_ok());
        assert!(PartitionDate::parse("2024-02-30").is_ok());
        assert!(PartitionDate::parse("2024/02/03").is_err());
        assert!(PartitionDate::parse("2024-1-3").is_err());
        assert!(PartitionDate::parse("2024-01-031").is_err());
        assert!(PartitionDate::parse("").is_err());
    }

    #[test]
    fn ordering_is_chronological() {
        let a = PartitionDate::parse("2023-12-31").unwrap();
        let b = PartitionDate::parse("2024-01-01").unwrap();
        assert!(a < b);
    }

    #[test]
    fn local_dates_ignores_noise() {
        let dir = TempDir::new().unwrap();
        let base = prefix_dir(dir.path(), "exports/core");
        fs::create_dir_all(base.join("2024-01-02")).unwrap();
        fs::create_dir_all(base.join("2024-01-01")).unwrap();
        fs::create_dir_all(base.join("tmp")).unwrap();
        fs::write(base.join("2024-01-03"), b"not a dir").unwrap();

        let dates: Vec<_> = local_dates(dir.path(), "exports/core")
            .unwrap()
            .into_iter()
            .map(|d| d.to_string())
            .collect();
        assert_eq!(dates, ["2024-01-01", "2024-01-02"]);
    }

    #[test]
    fn missing_prefix_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(local_dates(dir.path(), "exports/core").unwrap().is_empty());
    }
}
