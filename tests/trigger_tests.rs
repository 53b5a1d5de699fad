//! # Immediate Trigger Tests
//!
//! `reconcile_now` and the watch-driven reconcile built on top of it.

mod common;

use common::{annotate, injector, pod, pod_selector, FakeResources, FakeStore};
use kube::ResourceExt;
use kube_runtime::controller::Action;
use metadata_injector_controller::client::{DeclarationStore, ResourceClient, StoreError};
use metadata_injector_controller::constants::{
    ANNOTATION_DISABLE_AUTO_RECONCILE, ANNOTATION_RECONCILE_REQUESTED_AT,
};
use metadata_injector_controller::controller::{BatchScheduler, SchedulerConfig, SchedulerError};
use metadata_injector_controller::crd::{MetadataInjector, MetadataInjectorStatus};
use metadata_injector_controller::runtime::error_policy::handle_reconciliation_error;
use metadata_injector_controller::runtime::watch_loop::reconcile;
use metadata_injector_controller::runtime::{ReconcilerError, WatchContext};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

fn scheduler(store: &Arc<FakeStore>, resources: &Arc<FakeResources>) -> Arc<BatchScheduler> {
    Arc::new(BatchScheduler::new(
        SchedulerConfig {
            default_interval: DEFAULT_INTERVAL,
            ..SchedulerConfig::default()
        },
        Arc::clone(store) as Arc<dyn DeclarationStore>,
        Arc::clone(resources) as Arc<dyn ResourceClient>,
    ))
}

fn context(store: &Arc<FakeStore>, resources: &Arc<FakeResources>) -> Arc<WatchContext> {
    Arc::new(WatchContext::new(
        scheduler(store, resources),
        Arc::clone(store) as Arc<dyn DeclarationStore>,
        Duration::from_secs(5),
        Duration::from_secs(300),
    ))
}

#[tokio::test]
async fn test_reconcile_now_missing_declaration_is_not_an_error() {
    let store = Arc::new(FakeStore::new(vec![]));
    let resources = Arc::new(FakeResources::new());

    let result = scheduler(&store, &resources)
        .reconcile_now("default", "gone")
        .await
        .unwrap();

    assert_eq!(result, None);
    assert_eq!(store.patch_count(), 0);
}

#[tokio::test]
async fn test_reconcile_now_returns_time_until_next_run() {
    let store = Arc::new(FakeStore::new(vec![injector(
        "default",
        "a",
        pod_selector(&["default"], &[]),
    )]));
    let resources = Arc::new(FakeResources::new());
    resources.add("pods", pod("default", "web", &[]));

    let requeue = scheduler(&store, &resources)
        .reconcile_now("default", "a")
        .await
        .unwrap()
        .unwrap();

    assert!(requeue <= DEFAULT_INTERVAL);
    assert!(requeue > DEFAULT_INTERVAL - Duration::from_secs(5));
    assert_eq!(store.patched_names(), vec!["default/a"]);
    assert_eq!(resources.updated_names(), vec!["web"]);
}

#[tokio::test]
async fn test_reconcile_now_processes_disabled_declarations() {
    let mut mi = injector("default", "manual", pod_selector(&["default"], &[]));
    annotate(&mut mi, ANNOTATION_DISABLE_AUTO_RECONCILE, "true");
    let store = Arc::new(FakeStore::new(vec![mi]));
    let resources = Arc::new(FakeResources::new());

    let requeue = scheduler(&store, &resources)
        .reconcile_now("default", "manual")
        .await
        .unwrap();

    assert!(requeue.is_some());
    let status = store.stored("default", "manual").status.unwrap();
    assert_eq!(status.interval.as_deref(), Some("False"));
}

#[tokio::test]
async fn test_reconcile_now_fetch_failure_is_reported() {
    let scheduler = BatchScheduler::new(
        SchedulerConfig::default(),
        Arc::new(Unreachable),
        Arc::new(FakeResources::new()),
    );

    let err = scheduler.reconcile_now("default", "a").await.unwrap_err();
    assert!(matches!(err, SchedulerError::Fetch { .. }));
    assert!(matches!(err.store_error(), StoreError::Unavailable(_)));
}

#[tokio::test]
async fn test_watch_runs_new_declaration_and_requeues_for_next_run() {
    let store = Arc::new(FakeStore::new(vec![injector(
        "default",
        "fresh",
        pod_selector(&["default"], &[]),
    )]));
    let resources = Arc::new(FakeResources::new());
    let ctx = context(&store, &resources);

    let action = reconcile(Arc::new(store.stored("default", "fresh")), Arc::clone(&ctx))
        .await
        .unwrap();

    assert_ne!(action, Action::await_change());
    assert_eq!(store.patch_count(), 1);
}

#[tokio::test]
async fn test_watch_ignores_its_own_status_write() {
    let store = Arc::new(FakeStore::new(vec![injector(
        "default",
        "a",
        pod_selector(&["default"], &[]),
    )]));
    let resources = Arc::new(FakeResources::new());
    let ctx = context(&store, &resources);

    reconcile(Arc::new(store.stored("default", "a")), Arc::clone(&ctx))
        .await
        .unwrap();
    // The status write produces another watch event carrying the new status
    reconcile(Arc::new(store.stored("default", "a")), Arc::clone(&ctx))
        .await
        .unwrap();

    assert_eq!(store.patch_count(), 1);
}

#[tokio::test]
async fn test_watch_manual_request_runs_and_clears_annotation() {
    let mut mi = injector("default", "manual", pod_selector(&["default"], &[]));
    annotate(&mut mi, ANNOTATION_DISABLE_AUTO_RECONCILE, "true");
    annotate(&mut mi, ANNOTATION_RECONCILE_REQUESTED_AT, "2024-01-01T00:00:00Z");
    let store = Arc::new(FakeStore::new(vec![mi]));
    let resources = Arc::new(FakeResources::new());
    let ctx = context(&store, &resources);

    let action = reconcile(Arc::new(store.stored("default", "manual")), Arc::clone(&ctx))
        .await
        .unwrap();

    assert_eq!(action, Action::await_change());
    assert_eq!(store.patch_count(), 1);
    assert_eq!(
        store.cleared(),
        vec![(
            "default/manual".to_string(),
            ANNOTATION_RECONCILE_REQUESTED_AT.to_string()
        )]
    );
    assert!(!store
        .stored("default", "manual")
        .annotations()
        .contains_key(ANNOTATION_RECONCILE_REQUESTED_AT));
}

#[tokio::test]
async fn test_watch_event_with_stale_copy_uses_latest_declaration() {
    let store = Arc::new(FakeStore::new(vec![injector(
        "default",
        "busy",
        pod_selector(&["default"], &[]),
    )]));
    let resources = Arc::new(FakeResources::new());
    let ctx = context(&store, &resources);

    let event = store.stored("default", "busy");
    store.bump_version("default", "busy");

    reconcile(Arc::new(event), Arc::clone(&ctx)).await.unwrap();
    assert_eq!(store.patch_count(), 1);
}

#[tokio::test]
async fn test_failed_runs_back_off_per_declaration() {
    let scheduler = Arc::new(BatchScheduler::new(
        SchedulerConfig::default(),
        Arc::new(Unreachable),
        Arc::new(FakeResources::new()),
    ));
    let ctx = Arc::new(WatchContext::new(
        scheduler,
        Arc::new(Unreachable),
        Duration::from_secs(5),
        Duration::from_secs(300),
    ));
    let a = Arc::new(injector("default", "a", pod_selector(&[], &[])));
    let b = Arc::new(injector("default", "b", pod_selector(&[], &[])));

    let err = reconcile(Arc::clone(&a), Arc::clone(&ctx)).await.unwrap_err();
    assert!(matches!(err, ReconcilerError::Scheduler(SchedulerError::Fetch { .. })));

    let delays: Vec<Action> = (0..3)
        .map(|_| handle_reconciliation_error(Arc::clone(&a), &err, Arc::clone(&ctx)))
        .collect();
    assert_eq!(
        delays,
        vec![
            Action::requeue(Duration::from_secs(5)),
            Action::requeue(Duration::from_secs(5)),
            Action::requeue(Duration::from_secs(10)),
        ]
    );

    assert_eq!(
        handle_reconciliation_error(Arc::clone(&b), &err, Arc::clone(&ctx)),
        Action::requeue(Duration::from_secs(5))
    );

    ctx.reset_backoff("default/a");
    assert_eq!(
        handle_reconciliation_error(a, &err, ctx),
        Action::requeue(Duration::from_secs(5))
    );
}

/// Store whose API server is unreachable
#[derive(Debug)]
struct Unreachable;

#[async_trait::async_trait]
impl DeclarationStore for Unreachable {
    async fn list(&self) -> Result<Vec<MetadataInjector>, StoreError> {
        Err(StoreError::Unavailable("api down".to_string()))
    }

    async fn get(&self, _namespace: &str, _name: &str) -> Result<MetadataInjector, StoreError> {
        Err(StoreError::Unavailable("api down".to_string()))
    }

    async fn patch_status(
        &self,
        _injector: &MetadataInjector,
        _status: &MetadataInjectorStatus,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("api down".to_string()))
    }

    async fn clear_annotation(
        &self,
        _namespace: &str,
        _name: &str,
        _annotation: &str,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("api down".to_string()))
    }
}
