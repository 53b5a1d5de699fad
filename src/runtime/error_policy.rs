//! # Error Policy
//!
//! Backoff for watch-triggered runs that failed. Backoff state is tracked per
//! resource so one failing declaration does not delay the others.

use crate::crd::MetadataInjector;
use crate::runtime::context::{ReconcilerError, WatchContext};
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{error, info};

/// Handle reconciliation errors with Fibonacci backoff
pub fn handle_reconciliation_error(
    obj: Arc<MetadataInjector>,
    error: &ReconcilerError,
    ctx: Arc<WatchContext>,
) -> Action {
    let name = obj.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = obj.metadata.namespace.as_deref().unwrap_or("default");

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = name,
        resource.namespace = namespace,
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {namespace}/{name}: {error}");

    let (backoff, error_count) = ctx.next_backoff(&format!("{namespace}/{name}"));
    info!(
        backoff_secs = backoff.as_secs(),
        error_count,
        "Retrying with Fibonacci backoff"
    );
    Action::requeue(backoff)
}
