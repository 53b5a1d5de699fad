//! Scheduler error types.

use crate::client::StoreError;
use thiserror::Error;

/// Errors surfaced by the job processor and the immediate-trigger path.
///
/// Failures to list or update individual resources are logged and counted,
/// never returned; only the declaration itself can fail a job.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("failed to fetch MetadataInjector {namespace}/{name}: {source}")]
    Fetch {
        namespace: String,
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to update status of MetadataInjector {namespace}/{name}: {source}")]
    StatusUpdate {
        namespace: String,
        name: String,
        #[source]
        source: StoreError,
    },
}

impl SchedulerError {
    /// The store error behind this failure
    #[must_use]
    pub fn store_error(&self) -> &StoreError {
        match self {
            Self::Fetch { source, .. } | Self::StatusUpdate { source, .. } => source,
        }
    }
}
