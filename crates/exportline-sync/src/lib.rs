//! Exportline Sync - incremental mirror of date-partitioned table exports
//!
//! Lists the export bucket, decides which date partitions are new relative
//! to the local mirror, and downloads missing or size-mismatched objects.
//! Every run leaves a `last_sync.json` summary in the mirror root.

pub mod config;
pub mod dates;
pub mod engine;
pub mod store;
pub mod summary;

// Re-exports for convenience
pub use config::{ConfigError, SyncConfig};
pub use dates::{DateSelection, PartitionDate, ResolveError, resolve};
pub use engine::run;
pub use store::{LocalStore, ObjectEntry, ObjectStore, S3Store, StoreError};
pub use summary::SyncSummary;
