//! exportline-dataset: curated tables and dashboard views
//!
//! Reads every mirrored export partition, classifies items into users,
//! donations, donation links, accesses and payments, writes one Parquet
//! file per entity and loads them into a DuckDB database with the
//! dashboard's aggregation views.

pub mod builder;
mod config;
pub mod sql;

pub use builder::{BuildSummary, run};
pub use config::BuildConfig;
