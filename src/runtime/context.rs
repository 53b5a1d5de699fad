//! # Watch Context
//!
//! Shared state for watch-triggered reconciliations.

use crate::client::{DeclarationStore, StoreError};
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::scheduler::BatchScheduler;
use crate::controller::SchedulerError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Reconciliation failed: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Failed to clear reconcile request annotation: {0}")]
    ClearRequest(#[source] StoreError),
}

/// Why a watch event led to a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    /// No status yet, first time the controller sees the declaration
    Created,
    /// `metadata.generation` moved past `status.observedGeneration`
    SpecChanged,
    /// Control annotations changed the interval or disabled state
    IntervalChanged,
    /// `mictl reconcile` set the request annotation
    ManualCli,
    /// `status.nextScheduledTime` has passed
    Periodic,
}

impl TriggerSource {
    /// Get human-readable string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::SpecChanged => "spec-changed",
            Self::IntervalChanged => "interval-changed",
            Self::ManualCli => "manual-cli",
            Self::Periodic => "periodic",
        }
    }
}

/// Backoff state for a specific resource
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min, max),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }
}

pub struct WatchContext {
    pub scheduler: Arc<BatchScheduler>,
    pub store: Arc<dyn DeclarationStore>,
    /// Backoff state per resource (identified by namespace/name)
    pub backoff_states: Mutex<HashMap<String, BackoffState>>,
    backoff_min: Duration,
    backoff_max: Duration,
}

impl std::fmt::Debug for WatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchContext")
            .field("scheduler", &self.scheduler)
            .field("backoff_min", &self.backoff_min)
            .field("backoff_max", &self.backoff_max)
            .finish_non_exhaustive()
    }
}

impl WatchContext {
    #[must_use]
    pub fn new(
        scheduler: Arc<BatchScheduler>,
        store: Arc<dyn DeclarationStore>,
        backoff_min: Duration,
        backoff_max: Duration,
    ) -> Self {
        Self {
            scheduler,
            store,
            backoff_states: Mutex::new(HashMap::new()),
            backoff_min,
            backoff_max,
        }
    }

    /// Record a failure for `key` and return the delay before the next attempt
    /// together with the number of consecutive failures.
    pub fn next_backoff(&self, key: &str) -> (Duration, u32) {
        let mut states = self
            .backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let state = states
            .entry(key.to_string())
            .or_insert_with(|| BackoffState::new(self.backoff_min, self.backoff_max));
        state.increment_error();
        (state.backoff.next_backoff(), state.error_count)
    }

    /// Forget the failure history of `key` after a successful run
    pub fn reset_backoff(&self, key: &str) {
        self.backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}
