//! # Metrics
//!
//! Prometheus metrics for monitoring the scheduler.
//!
//! ## Metrics Exposed
//!
//! - `metadata_injector_batch_ticks_total` - Dispatcher ticks
//! - `metadata_injector_batch_list_errors_total` - Ticks skipped because declarations could not be listed
//! - `metadata_injector_jobs_enqueued_total` - Jobs placed on the queue by the dispatcher
//! - `metadata_injector_jobs_processed_total` - Jobs run to completion, by source
//! - `metadata_injector_job_errors_total` - Jobs whose status update failed, by source
//! - `metadata_injector_job_duration_seconds` - Time spent processing one job
//! - `metadata_injector_resources_updated_total` - Resources written back with injected metadata
//! - `metadata_injector_resource_update_errors_total` - Resource write-backs that failed
//! - `metadata_injector_namespace_list_errors_total` - Namespaces skipped because listing failed
//! - `metadata_injector_immediate_triggers_total` - Runs requested through the watch path
//! - `metadata_injector_queue_depth` - Jobs currently waiting in the queue

use anyhow::Result;
use prometheus::{HistogramVec, IntCounter, IntCounterVec, IntGauge, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static BATCH_TICKS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "metadata_injector_batch_ticks_total",
        "Total number of batch dispatcher ticks",
    )
    .expect("Failed to create BATCH_TICKS_TOTAL metric - this should never happen")
});

static BATCH_LIST_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "metadata_injector_batch_list_errors_total",
        "Total number of ticks skipped because MetadataInjectors could not be listed",
    )
    .expect("Failed to create BATCH_LIST_ERRORS_TOTAL metric - this should never happen")
});

static JOBS_ENQUEUED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "metadata_injector_jobs_enqueued_total",
        "Total number of jobs enqueued by the batch dispatcher",
    )
    .expect("Failed to create JOBS_ENQUEUED_TOTAL metric - this should never happen")
});

static JOBS_PROCESSED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "metadata_injector_jobs_processed_total",
            "Total number of processed jobs by source",
        ),
        &["source"],
    )
    .expect("Failed to create JOBS_PROCESSED_TOTAL metric - this should never happen")
});

static JOB_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "metadata_injector_job_errors_total",
            "Total number of jobs that failed to update status by source",
        ),
        &["source"],
    )
    .expect("Failed to create JOB_ERRORS_TOTAL metric - this should never happen")
});

static JOB_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "metadata_injector_job_duration_seconds",
            "Duration of job processing in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["source"],
    )
    .expect("Failed to create JOB_DURATION metric - this should never happen")
});

static RESOURCES_UPDATED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "metadata_injector_resources_updated_total",
        "Total number of resources written back with injected metadata",
    )
    .expect("Failed to create RESOURCES_UPDATED_TOTAL metric - this should never happen")
});

static RESOURCE_UPDATE_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "metadata_injector_resource_update_errors_total",
        "Total number of failed resource write-backs",
    )
    .expect("Failed to create RESOURCE_UPDATE_ERRORS_TOTAL metric - this should never happen")
});

static NAMESPACE_LIST_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "metadata_injector_namespace_list_errors_total",
        "Total number of namespaces skipped because listing resources failed",
    )
    .expect("Failed to create NAMESPACE_LIST_ERRORS_TOTAL metric - this should never happen")
});

static IMMEDIATE_TRIGGERS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "metadata_injector_immediate_triggers_total",
        "Total number of immediate reconciliations requested through the watch",
    )
    .expect("Failed to create IMMEDIATE_TRIGGERS_TOTAL metric - this should never happen")
});

static QUEUE_DEPTH: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "metadata_injector_queue_depth",
        "Current number of jobs waiting in the scheduler queue",
    )
    .expect("Failed to create QUEUE_DEPTH metric - this should never happen")
});

/// Register all metrics with the registry
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(BATCH_TICKS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(BATCH_LIST_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(JOBS_ENQUEUED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(JOBS_PROCESSED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(JOB_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(JOB_DURATION.clone()))?;
    REGISTRY.register(Box::new(RESOURCES_UPDATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RESOURCE_UPDATE_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(NAMESPACE_LIST_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(IMMEDIATE_TRIGGERS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(QUEUE_DEPTH.clone()))?;

    Ok(())
}

pub fn increment_batch_ticks() {
    BATCH_TICKS_TOTAL.inc();
}

pub fn increment_batch_list_errors() {
    BATCH_LIST_ERRORS_TOTAL.inc();
}

pub fn increment_jobs_enqueued() {
    JOBS_ENQUEUED_TOTAL.inc();
}

pub fn increment_jobs_processed(source: &str) {
    JOBS_PROCESSED_TOTAL.with_label_values(&[source]).inc();
}

pub fn increment_job_errors(source: &str) {
    JOB_ERRORS_TOTAL.with_label_values(&[source]).inc();
}

pub fn observe_job_duration(source: &str, duration: f64) {
    JOB_DURATION.with_label_values(&[source]).observe(duration);
}

pub fn increment_resources_updated(count: u64) {
    RESOURCES_UPDATED_TOTAL.inc_by(count);
}

pub fn increment_resource_update_errors() {
    RESOURCE_UPDATE_ERRORS_TOTAL.inc();
}

pub fn increment_namespace_list_errors() {
    NAMESPACE_LIST_ERRORS_TOTAL.inc();
}

pub fn increment_immediate_triggers() {
    IMMEDIATE_TRIGGERS_TOTAL.inc();
}

pub fn increment_queue_depth() {
    QUEUE_DEPTH.inc();
}

pub fn decrement_queue_depth() {
    QUEUE_DEPTH.dec();
}

/// Forget jobs that were still queued when the scheduler stopped
pub fn reset_queue_depth() {
    QUEUE_DEPTH.set(0);
}

#[must_use]
pub fn queue_depth() -> i64 {
    QUEUE_DEPTH.get()
}
