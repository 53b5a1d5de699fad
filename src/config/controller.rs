//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::controller::scheduler::SchedulerConfig;
use std::time::Duration;

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "text" | "plain" => Some(Self::Text),
            _ => None,
        }
    }
}

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Invalid values are ignored and the default is used instead.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Reconcile interval used when a MetadataInjector has no valid override (seconds)
    pub default_reconcile_interval_secs: u64,
    /// Period of the batch dispatcher tick (seconds)
    pub batch_interval_secs: u64,
    /// Number of scheduler workers draining the job queue
    pub workers: usize,
    /// Capacity of the bounded job queue
    pub queue_capacity: usize,
    /// HTTP port for `/metrics`, `/healthz` and `/readyz`
    pub metrics_port: u16,
    /// Log format (json, text)
    pub log_format: LogFormat,
    /// Serve Prometheus metrics
    pub enable_metrics: bool,
    /// First backoff after a failed watch-triggered reconciliation (seconds)
    pub error_backoff_min_secs: u64,
    /// Upper bound for the watch-triggered reconciliation backoff (seconds)
    pub error_backoff_max_secs: u64,
    /// Delay before the watch stream is restarted after it ends (seconds)
    pub watch_restart_delay_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            default_reconcile_interval_secs: DEFAULT_RECONCILE_INTERVAL_SECS,
            batch_interval_secs: DEFAULT_BATCH_INTERVAL_SECS,
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            metrics_port: DEFAULT_METRICS_PORT,
            log_format: LogFormat::Json,
            enable_metrics: true,
            error_backoff_min_secs: DEFAULT_ERROR_BACKOFF_MIN_SECS,
            error_backoff_max_secs: DEFAULT_ERROR_BACKOFF_MAX_SECS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    /// `from_env` is the production entry point; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            default_reconcile_interval_secs: parse_or(
                &lookup,
                "DEFAULT_RECONCILE_INTERVAL_SECS",
                defaults.default_reconcile_interval_secs,
            ),
            batch_interval_secs: parse_or(
                &lookup,
                "BATCH_INTERVAL_SECS",
                defaults.batch_interval_secs,
            ),
            workers: parse_or(&lookup, "WORKER_COUNT", defaults.workers),
            queue_capacity: parse_or(&lookup, "QUEUE_CAPACITY", defaults.queue_capacity),
            metrics_port: parse_or(&lookup, "METRICS_PORT", defaults.metrics_port),
            log_format: lookup("LOG_FORMAT")
                .and_then(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.log_format),
            enable_metrics: lookup("ENABLE_METRICS")
                .map_or(defaults.enable_metrics, |v| parse_bool_flag(&v)),
            error_backoff_min_secs: parse_or(
                &lookup,
                "ERROR_BACKOFF_MIN_SECS",
                defaults.error_backoff_min_secs,
            ),
            error_backoff_max_secs: parse_or(
                &lookup,
                "ERROR_BACKOFF_MAX_SECS",
                defaults.error_backoff_max_secs,
            ),
            watch_restart_delay_secs: parse_or(
                &lookup,
                "WATCH_RESTART_DELAY_SECS",
                defaults.watch_restart_delay_secs,
            ),
        }
    }

    /// Scheduler settings derived from this configuration
    #[must_use]
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            default_interval: Duration::from_secs(self.default_reconcile_interval_secs),
            batch_interval: Duration::from_secs(self.batch_interval_secs),
            workers: self.workers,
            queue_capacity: self.queue_capacity,
        }
    }

    /// Get error backoff minimum duration
    #[must_use]
    pub fn error_backoff_min(&self) -> Duration {
        Duration::from_secs(self.error_backoff_min_secs)
    }

    /// Get error backoff maximum duration
    #[must_use]
    pub fn error_backoff_max(&self) -> Duration {
        Duration::from_secs(self.error_backoff_max_secs)
    }

    /// Get watch restart delay duration
    #[must_use]
    pub fn watch_restart_delay(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }
}

/// Read a value or return default when it is missing or fails to parse
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_bool_flag(value: &str) -> bool {
    let v_lower = value.trim().to_lowercase();
    v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
}
