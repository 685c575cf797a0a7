//! Object store boundary for the export bucket
//!
//! Keys are `/`-separated like S3 keys. Prefixes passed to the listing
//! methods are directory-like and end in `/`.

mod local;
mod s3;

use std::io;
use std::path::Path;

use exportline_core::{Retryable, StreamError};

pub use local::LocalStore;
pub use s3::S3Store;

/// One listed object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Transport(#[from] StreamError),
    #[error("bad listing response for {prefix}: {message}")]
    Listing { prefix: String, message: String },
    #[error("invalid store URL: {0}")]
    InvalidUrl(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            Self::Listing { .. } | Self::InvalidUrl(_) => false,
            Self::Io(e) => !matches!(
                e.kind(),
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied | io::ErrorKind::StorageFull
            ),
        }
    }
}

pub trait ObjectStore: Send + Sync {
    /// Human-readable location for logs
    fn describe(&self) -> String;

    /// Immediate sub-prefixes of `prefix`, each ending in `/`
    fn list_prefixes(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Every object below `prefix`, at any depth
    fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StoreError>;

    /// Write the object to `dest`, replacing it. Returns bytes written.
    fn download(&self, key: &str, dest: &Path) -> Result<u64, StoreError>;
}

/// Normalise a listing prefix to end in exactly one `/`
pub(crate) fn dir_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_prefix_normalises() {
        assert_eq!(dir_prefix("exports/core"), "exports/core/");
        assert_eq!(dir_prefix("/exports/core//"), "exports/core/");
        assert_eq!(dir_prefix(""), "");
    }

    #[test]
    fn retryability() {
        let gone = StoreError::Transport(StreamError::Status {
            status: 404,
            message: "missing".into(),
        });
        assert!(!gone.is_retryable());
        let busy = StoreError::Transport(StreamError::Status {
            status: 503,
            message: "slow down".into(),
        });
        assert!(busy.is_retryable());
        assert!(!StoreError::Io(io::Error::from(io::ErrorKind::NotFound)).is_retryable());
        assert!(StoreError::Io(io::Error::from(io::ErrorKind::ConnectionReset)).is_retryable());
    }
}
