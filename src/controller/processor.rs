//! # Job Processor
//!
//! Executes one [`ReconcileJob`]: resolves every selector, merges the injected
//! metadata into each matched object, writes the objects back and finally
//! records the run in the declaration's status.
//!
//! Listing and update failures are contained: they are logged, counted and
//! skipped. Only a failed status write fails the job.

use crate::client::{DeclarationStore, ResourceClient};
use crate::constants::CONDITION_READY;
use crate::controller::error::SchedulerError;
use crate::controller::interval::{calculate_next_run, effective_interval, interval_status};
use crate::controller::job::ReconcileJob;
use crate::controller::merge::merge_metadata;
use crate::controller::selector::resolve_selector;
use crate::crd::{Condition, MetadataInjector, MetadataInjectorStatus};
use crate::observability::metrics;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use kube::ResourceExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, warn, Instrument};

/// Reason set on the Ready condition after a completed run
pub const REASON_RECONCILE_SUCCEEDED: &str = "ReconcileSucceeded";

/// Outcome counts of a single job
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JobReport {
    /// Objects that passed the name filter
    pub matched: usize,
    /// Objects written back successfully
    pub updated: usize,
    /// Objects whose write-back failed
    pub failed: usize,
    /// Namespaces skipped because listing failed
    pub failed_namespaces: usize,
}

impl JobReport {
    /// Human readable summary used as the Ready condition message
    #[must_use]
    pub fn summary(&self) -> String {
        let mut message = format!(
            "{} resources matched, {} updated, {} failed",
            self.matched, self.updated, self.failed
        );
        if self.failed_namespaces > 0 {
            message.push_str(&format!(
                ", {} namespace listings failed",
                self.failed_namespaces
            ));
        }
        message
    }
}

/// Shared by the worker pool and the immediate-trigger path
#[derive(Clone)]
pub struct JobProcessor {
    store: Arc<dyn DeclarationStore>,
    resources: Arc<dyn ResourceClient>,
    default_interval: Duration,
}

impl std::fmt::Debug for JobProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobProcessor")
            .field("default_interval", &self.default_interval)
            .finish_non_exhaustive()
    }
}

impl JobProcessor {
    #[must_use]
    pub fn new(
        store: Arc<dyn DeclarationStore>,
        resources: Arc<dyn ResourceClient>,
        default_interval: Duration,
    ) -> Self {
        Self {
            store,
            resources,
            default_interval,
        }
    }

    #[must_use]
    pub fn default_interval(&self) -> Duration {
        self.default_interval
    }

    /// Run one job to completion
    pub async fn process_job(&self, job: &ReconcileJob) -> Result<JobReport, SchedulerError> {
        let span = info_span!(
            "scheduler.job",
            resource.name = %job.name(),
            resource.namespace = %job.namespace(),
            source = job.source.as_str(),
        );

        async move {
            let started = Instant::now();
            let source = job.source.as_str();
            let status_text = interval_status(&job.injector, self.default_interval);

            let report = self.apply_selectors(&job.injector).await;
            let result = self
                .update_status(&job.injector, &status_text, job.scheduled_at, &report)
                .await;

            metrics::observe_job_duration(source, started.elapsed().as_secs_f64());
            metrics::increment_jobs_processed(source);
            if result.is_err() {
                metrics::increment_job_errors(source);
            }

            info!(
                matched = report.matched,
                updated = report.updated,
                failed = report.failed,
                failed_namespaces = report.failed_namespaces,
                interval = %status_text,
                "job processed"
            );
            result.map(|_| report)
        }
        .instrument(span)
        .await
    }

    async fn apply_selectors(&self, injector: &MetadataInjector) -> JobReport {
        let mut report = JobReport::default();
        let inject = &injector.spec.inject;

        for selector in &injector.spec.selectors {
            let resolved = resolve_selector(selector);

            for namespace in &resolved.namespaces {
                let objects = match self.resources.list(&resolved.target, namespace).await {
                    Ok(objects) => objects,
                    Err(e) => {
                        warn!(
                            gvr = %resolved.target,
                            namespace = %namespace,
                            error = %e,
                            "failed to list resources, skipping namespace"
                        );
                        metrics::increment_namespace_list_errors();
                        report.failed_namespaces += 1;
                        continue;
                    }
                };

                for mut object in objects {
                    let name = object.name_any();
                    if !resolved.accepts(&name) {
                        continue;
                    }
                    report.matched += 1;

                    let changed = merge_metadata(&mut object.metadata, inject);
                    match self
                        .resources
                        .update(&resolved.target, namespace, &object)
                        .await
                    {
                        Ok(()) => {
                            report.updated += 1;
                            debug!(gvr = %resolved.target, name = %name, changed, "resource updated");
                        }
                        Err(e) => {
                            warn!(
                                gvr = %resolved.target,
                                namespace = %object.namespace().unwrap_or_default(),
                                name = %name,
                                error = %e,
                                "failed to update resource"
                            );
                            metrics::increment_resource_update_errors();
                            report.failed += 1;
                        }
                    }
                }
            }
        }

        metrics::increment_resources_updated(report.updated as u64);
        report
    }

    /// Record a completed run in the declaration's status
    pub async fn update_status(
        &self,
        injector: &MetadataInjector,
        interval_status: &str,
        scheduled_at: DateTime<Utc>,
        report: &JobReport,
    ) -> Result<MetadataInjectorStatus, SchedulerError> {
        let now = Utc::now().trunc_subsecs(0);
        let status = build_status(
            injector,
            self.default_interval,
            interval_status,
            scheduled_at,
            now,
            report,
        );

        self.store
            .patch_status(injector, &status)
            .await
            .map_err(|source| SchedulerError::StatusUpdate {
                namespace: injector.namespace().unwrap_or_default(),
                name: injector.name_any(),
                source,
            })?;
        Ok(status)
    }
}

/// Compute the status written after a run finished at `now`.
///
/// The next run is recomputed from the declaration at write time so that
/// `nextScheduledTime - lastSuccessfulTime` always equals the effective interval.
#[must_use]
pub fn build_status(
    injector: &MetadataInjector,
    default_interval: Duration,
    interval_status: &str,
    scheduled_at: DateTime<Utc>,
    now: DateTime<Utc>,
    report: &JobReport,
) -> MetadataInjectorStatus {
    let next = calculate_next_run(now, effective_interval(injector, default_interval));
    let mut status = injector.status.clone().unwrap_or_default();

    status.last_scheduled_time = Some(rfc3339(scheduled_at.trunc_subsecs(0)));
    status.last_successful_time = Some(rfc3339(now));
    status.next_scheduled_time = Some(rfc3339(next));
    status.interval = Some(interval_status.to_string());
    status.observed_generation = injector.metadata.generation;
    status.upsert_condition(Condition {
        r#type: CONDITION_READY.to_string(),
        status: "True".to_string(),
        last_transition_time: Some(rfc3339(now)),
        reason: Some(REASON_RECONCILE_SUCCEEDED.to_string()),
        message: Some(report.summary()),
    });
    status
}

fn rfc3339(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}
