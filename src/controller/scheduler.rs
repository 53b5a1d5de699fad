//! # Batch Scheduler
//!
//! Periodic reconciliation of every `MetadataInjector`.
//!
//! A single dispatcher task ticks every `batch_interval`, lists all
//! declarations and enqueues a job for each one that has not opted out of
//! automatic reconciliation. `workers` tasks share the receiving end of the
//! bounded queue and run jobs through the [`JobProcessor`].
//!
//! ```text
//! dispatcher --(bounded mpsc, send().await)--> worker 0..N --> JobProcessor
//! ```
//!
//! A full queue blocks the dispatcher; the tick is delayed rather than
//! dropped. `stop()` cancels a shared token and waits for every task, letting
//! jobs already being processed finish.

use crate::client::{DeclarationStore, ResourceClient};
use crate::constants::{
    DEFAULT_BATCH_INTERVAL_SECS, DEFAULT_QUEUE_CAPACITY, DEFAULT_RECONCILE_INTERVAL_SECS,
    DEFAULT_WORKERS, MAX_BATCH_INTERVAL_SECS,
};
use crate::controller::interval::is_auto_reconcile_disabled;
use crate::controller::job::{JobSource, ReconcileJob};
use crate::controller::processor::JobProcessor;
use crate::crd::MetadataInjector;
use crate::observability::metrics;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<ReconcileJob>>>;

/// Scheduler settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Interval used when a declaration has no valid override
    pub default_interval: Duration,
    /// Period of the dispatcher tick
    pub batch_interval: Duration,
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_interval: Duration::from_secs(DEFAULT_RECONCILE_INTERVAL_SECS),
            batch_interval: Duration::from_secs(DEFAULT_BATCH_INTERVAL_SECS),
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl SchedulerConfig {
    /// Replace values the runtime cannot work with by their defaults.
    /// The batch interval is capped at [`MAX_BATCH_INTERVAL_SECS`] so the
    /// dispatcher deadline always fits in an `Instant`.
    #[must_use]
    pub fn normalized(self) -> Self {
        let defaults = Self::default();
        Self {
            default_interval: if self.default_interval.is_zero() {
                defaults.default_interval
            } else {
                self.default_interval
            },
            batch_interval: if self.batch_interval.is_zero() {
                defaults.batch_interval
            } else {
                self.batch_interval
                    .min(Duration::from_secs(MAX_BATCH_INTERVAL_SECS))
            },
            workers: self.workers.max(1),
            queue_capacity: self.queue_capacity.max(1),
        }
    }
}

/// What a single dispatcher tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Number of jobs placed on the queue
    Enqueued(usize),
    /// Declarations could not be listed; nothing was enqueued
    Skipped,
    /// Cancellation or a closed queue interrupted the tick
    Stopped,
}

/// Owns the dispatcher and worker tasks
pub struct BatchScheduler {
    config: SchedulerConfig,
    store: Arc<dyn DeclarationStore>,
    processor: JobProcessor,
    shutdown: CancellationToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl std::fmt::Debug for BatchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScheduler")
            .field("config", &self.config)
            .field("started", &self.started.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl BatchScheduler {
    #[must_use]
    pub fn new(
        config: SchedulerConfig,
        store: Arc<dyn DeclarationStore>,
        resources: Arc<dyn ResourceClient>,
    ) -> Self {
        let config = config.normalized();
        let processor = JobProcessor::new(Arc::clone(&store), resources, config.default_interval);
        Self {
            config,
            store,
            processor,
            shutdown: CancellationToken::new(),
            handles: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub(crate) fn store(&self) -> &dyn DeclarationStore {
        self.store.as_ref()
    }

    pub(crate) fn processor(&self) -> &JobProcessor {
        &self.processor
    }

    /// Token cancelled by [`BatchScheduler::stop`]
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawn the dispatcher and the worker pool. Calling it again is a no-op.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let (tx, rx) = mpsc::channel(self.config.queue_capacity);
        let rx: SharedReceiver = Arc::new(tokio::sync::Mutex::new(rx));

        let mut handles = Vec::with_capacity(self.config.workers + 1);
        handles.push(tokio::spawn(run_dispatcher(
            Arc::clone(&self.store),
            tx,
            self.config.clone(),
            self.shutdown.clone(),
        )));
        for id in 0..self.config.workers {
            handles.push(tokio::spawn(run_worker(
                id,
                Arc::clone(&rx),
                self.processor.clone(),
                self.shutdown.clone(),
            )));
        }

        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(handles);

        info!(
            workers = self.config.workers,
            queue_capacity = self.config.queue_capacity,
            batch_interval_secs = self.config.batch_interval.as_secs(),
            default_interval_secs = self.config.default_interval.as_secs(),
            "batch scheduler started"
        );
    }

    /// Signal every task to stop and wait for them to exit.
    /// In-flight jobs run to completion; queued jobs are dropped and no
    /// longer counted in the queue depth gauge.
    pub async fn stop(&self) {
        self.shutdown.cancel();

        let handles = std::mem::take(&mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner));
        if handles.is_empty() {
            return;
        }
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "scheduler task panicked");
            }
        }
        metrics::reset_queue_depth();
        info!("batch scheduler stopped");
    }
}

/// Jobs for every declaration that has not opted out of the periodic batch
#[must_use]
pub fn eligible_jobs(
    injectors: &[MetadataInjector],
    default_interval: Duration,
    now: DateTime<Utc>,
) -> Vec<ReconcileJob> {
    injectors
        .iter()
        .filter(|injector| !is_auto_reconcile_disabled(injector))
        .map(|injector| ReconcileJob::new(injector, default_interval, now, JobSource::Batch))
        .collect()
}

/// Run one dispatcher tick: list declarations and enqueue their jobs.
/// Blocks while the queue is full, giving up when `shutdown` is cancelled.
pub async fn dispatch_batch(
    store: &dyn DeclarationStore,
    tx: &mpsc::Sender<ReconcileJob>,
    default_interval: Duration,
    shutdown: &CancellationToken,
) -> TickOutcome {
    metrics::increment_batch_ticks();

    let injectors = match store.list().await {
        Ok(injectors) => injectors,
        Err(e) => {
            warn!(error = %e, "failed to list MetadataInjectors, skipping tick");
            metrics::increment_batch_list_errors();
            return TickOutcome::Skipped;
        }
    };

    let jobs = eligible_jobs(&injectors, default_interval, Utc::now());
    debug!(
        total = injectors.len(),
        eligible = jobs.len(),
        "dispatching batch"
    );

    let mut enqueued = 0;
    for job in jobs {
        let name = job.name();
        let namespace = job.namespace();
        tokio::select! {
            biased;
            () = shutdown.cancelled() => return TickOutcome::Stopped,
            sent = tx.send(job) => {
                if sent.is_err() {
                    return TickOutcome::Stopped;
                }
            }
        }
        metrics::increment_jobs_enqueued();
        metrics::increment_queue_depth();
        debug!(resource.name = %name, resource.namespace = %namespace, "job enqueued");
        enqueued += 1;
    }
    TickOutcome::Enqueued(enqueued)
}

async fn run_dispatcher(
    store: Arc<dyn DeclarationStore>,
    tx: mpsc::Sender<ReconcileJob>,
    config: SchedulerConfig,
    shutdown: CancellationToken,
) {
    let period = config.batch_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let outcome = dispatch_batch(store.as_ref(), &tx, config.default_interval, &shutdown)
            .instrument(info_span!("scheduler.tick"))
            .await;
        if outcome == TickOutcome::Stopped {
            break;
        }
    }
    debug!("dispatcher exited");
}

async fn run_worker(
    id: usize,
    rx: SharedReceiver,
    processor: JobProcessor,
    shutdown: CancellationToken,
) {
    loop {
        let next = {
            let mut rx = rx.lock().await;
            tokio::select! {
                biased;
                () = shutdown.cancelled() => None,
                job = rx.recv() => job,
            }
        };
        let Some(job) = next else {
            break;
        };
        metrics::decrement_queue_depth();

        if let Err(e) = processor.process_job(&job).await {
            error!(
                worker = id,
                resource.name = %job.name(),
                resource.namespace = %job.namespace(),
                error = %e,
                "failed to process job"
            );
        }
    }
    debug!(worker = id, "worker exited");
}
