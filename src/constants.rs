//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent the scheduler defaults and can be overridden via
//! environment variables (see [`crate::config::ControllerConfig`]).

/// Annotation on a MetadataInjector that removes it from the periodic batch.
/// Parsed as a boolean; anything unparseable counts as `false`.
pub const ANNOTATION_DISABLE_AUTO_RECONCILE: &str =
    "metadata-injector.ruso.dev/disable-auto-reconcile";

/// Annotation on a MetadataInjector overriding its reconcile interval.
/// Parsed as a duration (e.g. "30s", "10m", "1h30m"); invalid values fall back
/// to the default interval.
pub const ANNOTATION_RECONCILE_INTERVAL: &str = "metadata-injector.ruso.dev/reconcile-interval";

/// Annotation set by `mictl reconcile` to request an immediate run.
/// Cleared by the controller once the run has completed.
pub const ANNOTATION_RECONCILE_REQUESTED_AT: &str =
    "metadata-injector.ruso.dev/reconcile-requested-at";

/// Value written to `status.interval` when auto reconciliation is disabled
pub const INTERVAL_STATUS_DISABLED: &str = "False";

/// Field manager used for patches issued by the controller
pub const FIELD_MANAGER: &str = "metadata-injector-controller";

/// Condition type written on every successful status update
pub const CONDITION_READY: &str = "Ready";

/// Default reconcile interval per MetadataInjector (seconds)
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 300;

/// Default period of the batch dispatcher tick (seconds)
pub const DEFAULT_BATCH_INTERVAL_SECS: u64 = 60;

/// Upper bound for the batch dispatcher tick (seconds)
pub const MAX_BATCH_INTERVAL_SECS: u64 = 86_400;

/// Default number of scheduler workers
pub const DEFAULT_WORKERS: usize = 5;

/// Default capacity of the scheduler job queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default minimum backoff after a failed immediate reconciliation (seconds)
pub const DEFAULT_ERROR_BACKOFF_MIN_SECS: u64 = 5;

/// Default maximum backoff after a failed immediate reconciliation (seconds)
pub const DEFAULT_ERROR_BACKOFF_MAX_SECS: u64 = 300;

/// Default delay before restarting the watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Tolerance applied when deciding whether `nextScheduledTime` has passed (seconds)
pub const SCHEDULE_TOLERANCE_SECS: i64 = 2;
