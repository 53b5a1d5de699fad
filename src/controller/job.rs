//! # Reconcile Jobs
//!
//! A unit of work handed from the dispatcher (or the watch path) to the
//! job processor.

use crate::controller::interval::{calculate_next_run, effective_interval};
use crate::crd::MetadataInjector;
use chrono::{DateTime, Utc};
use kube::ResourceExt;
use std::time::Duration;

/// Where a job came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSource {
    /// Periodic batch dispatcher tick
    Batch,
    /// Watch-triggered immediate run
    Immediate,
}

impl JobSource {
    /// Get the source as a string for logging and metric labels
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Batch => "batch",
            Self::Immediate => "immediate",
        }
    }
}

/// One scheduled run for one declaration.
///
/// The job owns a copy of the declaration taken when it was scheduled, so
/// later changes to the stored object do not affect a queued job.
#[derive(Debug, Clone)]
pub struct ReconcileJob {
    pub injector: MetadataInjector,
    pub next_run: DateTime<Utc>,
    pub scheduled_at: DateTime<Utc>,
    pub source: JobSource,
}

impl ReconcileJob {
    /// Build a job for `injector` scheduled at `now`
    #[must_use]
    pub fn new(
        injector: &MetadataInjector,
        default_interval: Duration,
        now: DateTime<Utc>,
        source: JobSource,
    ) -> Self {
        Self {
            injector: injector.clone(),
            next_run: calculate_next_run(now, effective_interval(injector, default_interval)),
            scheduled_at: now,
            source,
        }
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.injector.name_any()
    }

    #[must_use]
    pub fn namespace(&self) -> String {
        self.injector.namespace().unwrap_or_default()
    }
}
