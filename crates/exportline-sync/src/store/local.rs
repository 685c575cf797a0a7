//! Directory-backed store: a mounted or copied bucket

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{ObjectEntry, ObjectStore, StoreError, dir_prefix};

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in key.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }

    /// Key of a file below the root, `/`-joined
    fn key_for(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
        Some(parts?.join("/"))
    }
}

impl ObjectStore for LocalStore {
    fn describe(&self) -> String {
        format!("local:{}", self.root.display())
    }

    fn list_prefixes(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let prefix = dir_prefix(prefix);
        let entries = match fs::read_dir(self.path_for(&prefix)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut prefixes = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                prefixes.push(format!("{prefix}{name}/"));
            }
        }
        prefixes.sort();
        Ok(prefixes)
    }

    fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StoreError> {
        let dir = self.path_for(&dir_prefix(prefix));
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let Some(dir_str) = dir.to_str() else {
            let msg = format!("non-UTF-8 path {}", dir.display());
            return Err(io::Error::new(io::ErrorKind::InvalidInput, msg).into());
        };
        let pattern = format!("{}/**/*", glob::Pattern::escape(dir_str));
        let paths = glob::glob(&pattern).map_err(|e| StoreError::InvalidUrl(e.to_string()))?;

        let mut objects = Vec::new();
        for path in paths {
            let path = path.map_err(glob::GlobError::into_error)?;
            let meta = fs::metadata(&path)?;
            if !meta.is_file() {
                continue;
            }
            match self.key_for(&path) {
                Some(key) => objects.push(ObjectEntry {
                    key,
                    size: meta.len(),
                }),
                None => log::warn!("Skipping unlistable file {}", path.display()),
            }
        }
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    fn download(&self, key: &str, dest: &Path) -> Result<u64, StoreError> {
        Ok(fs::copy(self.path_for(key), dest)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn bucket() -> TempDir {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("exports/core/2024-01-01/AWSDynamoDB/abc/data");
        fs::create_dir_all(&data).unwrap();
        fs::write(data.join("part-0.json.gz"), b"12345").unwrap();
        fs::write(
            dir.path().join("exports/core/2024-01-01/AWSDynamoDB/abc/manifest-summary.json"),
            b"{}",
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("exports/core/2024-01-02")).unwrap();
        dir
    }

    #[test]
    fn lists_date_prefixes() {
        let dir = bucket();
        let store = LocalStore::new(dir.path());
        assert_eq!(
            store.list_prefixes("exports/core").unwrap(),
            ["exports/core/2024-01-01/", "exports/core/2024-01-02/"]
        );
    }

    #[test]
    fn lists_objects_recursively_with_sizes() {
        let dir = bucket();
        let store = LocalStore::new(dir.path());
        let objects = store.list_objects("exports/core/2024-01-01/").unwrap();
        assert_eq!(
            objects,
            [
                ObjectEntry {
                    key: "exports/core/2024-01-01/AWSDynamoDB/abc/data/part-0.json.gz".into(),
                    size: 5
                },
                ObjectEntry {
                    key: "exports/core/2024-01-01/AWSDynamoDB/abc/manifest-summary.json".into(),
                    size: 2
                },
            ]
        );
        assert!(store.list_objects("exports/core/2030-01-01/").unwrap().is_empty());
    }

    #[test]
    fn download_copies_bytes() {
        let dir = bucket();
        let out = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());
        let dest = out.path().join("part.gz");
        let n = store
            .download("exports/core/2024-01-01/AWSDynamoDB/abc/data/part-0.json.gz", &dest)
            .unwrap();
        assert_eq!(n, 5);
        assert_eq!(fs::read(&dest).unwrap(), b"12345");
    }
}
