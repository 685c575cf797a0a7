//! Which partitions a run should fetch

use std::collections::BTreeSet;

pub use exportline_ddb::partition::{InvalidDate, PartitionDate, is_date_shape, local_dates};

/// Date selection mode for a sync run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DateSelection {
    /// Exactly this date, whether or not it exists remotely
    Explicit(String),
    /// Every remote date
    AllDates,
    /// Remote dates newer than the newest local one
    #[default]
    FromLast,
}

impl DateSelection {
    pub fn is_explicit(&self) -> bool {
        matches!(self, Self::Explicit(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    InvalidDateFormat(#[from] InvalidDate),
}

/// Pick the dates to sync, ascending.
///
/// `FromLast` with no local data fetches only the newest remote date so a
/// first run doesn't pull the whole export history.
pub fn resolve(
    selection: &DateSelection,
    remote: &BTreeSet<PartitionDate>,
    local: &BTreeSet<PartitionDate>,
) -> Result<Vec<PartitionDate>, ResolveError> {
    match selection {
        DateSelection::Explicit(date) => Ok(vec![PartitionDate::parse(date)?]),
        DateSelection::AllDates => Ok(remote.iter().cloned().collect()),
        DateSelection::FromLast => {
            let Some(latest_remote) = remote.last() else {
                return Ok(Vec::new());
            };
            match local.last() {
                None => {
                    log::info!(
                        "No local partitions yet, fetching only the latest remote date {latest_remote}"
                    );
                    Ok(vec![latest_remote.clone()])
                }
                Some(latest_local) => Ok(remote
                    .iter()
                    .filter(|d| *d > latest_local)
                    .cloned()
                    .collect()),
            }
        }
    }
}
