//! # Immediate Trigger
//!
//! Runs a single declaration right away, outside the batch cadence. Used by
//! the watch loop when a `MetadataInjector` is created or changed.

use crate::controller::error::SchedulerError;
use crate::controller::job::{JobSource, ReconcileJob};
use crate::controller::scheduler::BatchScheduler;
use crate::observability::metrics;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

impl BatchScheduler {
    /// Fetch and process one declaration in the caller's task.
    ///
    /// Returns `Ok(None)` when the declaration no longer exists. Otherwise
    /// returns how long until its next periodic run is due. Declarations that
    /// disabled automatic reconciliation are still processed.
    pub async fn reconcile_now(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Duration>, SchedulerError> {
        metrics::increment_immediate_triggers();

        let injector = match self.store().get(namespace, name).await {
            Ok(injector) => injector,
            Err(e) if e.is_not_found() => {
                debug!(
                    resource.name = %name,
                    resource.namespace = %namespace,
                    "MetadataInjector not found, nothing to do"
                );
                return Ok(None);
            }
            Err(source) => {
                return Err(SchedulerError::Fetch {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                    source,
                })
            }
        };

        let job = ReconcileJob::new(
            &injector,
            self.processor().default_interval(),
            Utc::now(),
            JobSource::Immediate,
        );
        self.processor().process_job(&job).await?;

        Ok(Some(requeue_after(job.next_run, Utc::now())))
    }
}

/// Time left until `next_run`, zero when it has already passed
#[must_use]
pub fn requeue_after(next_run: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (next_run - now).to_std().unwrap_or(Duration::ZERO)
}
