//! # Watch Loop
//!
//! kube-runtime controller over `MetadataInjector` resources. Creating or
//! changing a declaration runs it immediately through
//! [`BatchScheduler::reconcile_now`](crate::controller::BatchScheduler::reconcile_now)
//! instead of waiting for the next batch tick.
//!
//! Status writes made by the scheduler also produce watch events. A run only
//! happens when something the scheduler cares about changed:
//!
//! - the declaration has no status yet
//! - `metadata.generation` differs from `status.observedGeneration`
//! - the control annotations changed the interval text written to status
//! - `mictl reconcile` set the request annotation
//! - `status.nextScheduledTime` has passed (declarations with auto reconcile
//!   disabled are excluded)
//!
//! Otherwise the event is requeued for when the next run is due.

use crate::constants::{ANNOTATION_RECONCILE_REQUESTED_AT, SCHEDULE_TOLERANCE_SECS};
use crate::controller::interval::{interval_status, is_auto_reconcile_disabled};
use crate::crd::MetadataInjector;
use crate::runtime::context::{ReconcilerError, TriggerSource, WatchContext};
use crate::runtime::error_policy::handle_reconciliation_error;
use crate::server::ServerState;
use chrono::{DateTime, TimeDelta, Utc};
use futures::StreamExt;
use kube::api::Api;
use kube::ResourceExt;
use kube_runtime::{controller::Action, watcher, Controller};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

/// What a watch event should lead to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchDecision {
    Run(TriggerSource),
    /// Nothing changed; check again after the given delay
    Wait(Duration),
    /// Nothing changed and no periodic run is expected from the watch
    Idle,
}

/// Decide whether a watch event for `obj` warrants a run at `now`
#[must_use]
pub fn decide(obj: &MetadataInjector, default_interval: Duration, now: DateTime<Utc>) -> WatchDecision {
    if obj.annotations().contains_key(ANNOTATION_RECONCILE_REQUESTED_AT) {
        return WatchDecision::Run(TriggerSource::ManualCli);
    }

    let Some(status) = &obj.status else {
        return WatchDecision::Run(TriggerSource::Created);
    };

    if status.observed_generation != obj.metadata.generation {
        return WatchDecision::Run(TriggerSource::SpecChanged);
    }

    if status.interval.as_deref() != Some(interval_status(obj, default_interval).as_str()) {
        return WatchDecision::Run(TriggerSource::IntervalChanged);
    }

    if is_auto_reconcile_disabled(obj) {
        return WatchDecision::Idle;
    }

    let next = status
        .next_scheduled_time
        .as_deref()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc));
    match next {
        Some(next) if now < next - TimeDelta::seconds(SCHEDULE_TOLERANCE_SECS) => {
            WatchDecision::Wait((next - now).to_std().unwrap_or(Duration::ZERO))
        }
        _ => WatchDecision::Run(TriggerSource::Periodic),
    }
}

/// Reconcile one `MetadataInjector` on behalf of the watch
pub async fn reconcile(
    obj: Arc<MetadataInjector>,
    ctx: Arc<WatchContext>,
) -> Result<Action, ReconcilerError> {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();
    let span = tracing::info_span!(
        "controller.watch.reconcile",
        resource.name = %name,
        resource.namespace = %namespace,
        resource.generation = obj.metadata.generation.unwrap_or(0),
    );

    async move {
        let default_interval = ctx.scheduler.config().default_interval;
        let trigger = match decide(&obj, default_interval, Utc::now()) {
            WatchDecision::Run(trigger) => trigger,
            WatchDecision::Wait(remaining) => {
                debug!(requeue_secs = remaining.as_secs(), "next run not due yet");
                return Ok(Action::requeue(remaining));
            }
            WatchDecision::Idle => {
                debug!("auto reconcile disabled and nothing changed");
                return Ok(Action::await_change());
            }
        };

        info!(trigger_source = trigger.as_str(), "watch.event.reconcile");
        let requeue = ctx.scheduler.reconcile_now(&namespace, &name).await?;

        if trigger == TriggerSource::ManualCli && requeue.is_some() {
            ctx.store
                .clear_annotation(&namespace, &name, ANNOTATION_RECONCILE_REQUESTED_AT)
                .await
                .map_err(ReconcilerError::ClearRequest)?;
        }
        ctx.reset_backoff(&format!("{namespace}/{name}"));

        Ok(match requeue {
            Some(after) if !after.is_zero() && !is_auto_reconcile_disabled(&obj) => {
                Action::requeue(after)
            }
            _ => Action::await_change(),
        })
    }
    .instrument(span)
    .await
}

/// Run the controller watch loop until `shutdown` is cancelled.
/// The watch is restarted after `restart_delay` whenever its stream ends.
pub async fn run_watch_loop(
    injectors: Api<MetadataInjector>,
    ctx: Arc<WatchContext>,
    server_state: Arc<ServerState>,
    restart_delay: Duration,
    shutdown: CancellationToken,
) {
    let signal_state = Arc::clone(&server_state);
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
        signal_state.is_ready.store(false, Ordering::Relaxed);
        signal_token.cancel();
    });

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        info!("Starting controller watch loop...");
        Controller::new(injectors.clone(), watcher::Config::default().any_semantic())
            .shutdown_on_signal()
            .run(reconcile, handle_reconciliation_error, Arc::clone(&ctx))
            .for_each(|result| {
                match result {
                    Ok((obj, _action)) => debug!(resource.name = %obj.name, "watch.event.reconciled"),
                    Err(e) => warn!(error = %e, "Controller stream error"),
                }
                futures::future::ready(())
            })
            .await;

        if shutdown.is_cancelled() {
            break;
        }
        warn!(
            "Controller watch stream ended, restarting in {} seconds...",
            restart_delay.as_secs()
        );
        tokio::select! {
            () = shutdown.cancelled() => break,
            () = tokio::time::sleep(restart_delay) => {}
        }
    }

    info!("Controller watch loop stopped");
}

/// Resolves on SIGINT, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
