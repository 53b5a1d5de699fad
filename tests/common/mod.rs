//! Common test utilities for scheduler integration tests
//!
//! In-memory implementations of [`DeclarationStore`] and [`ResourceClient`]
//! plus builders for `MetadataInjector` declarations and untyped objects.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use kube::core::{ObjectMeta, TypeMeta};
use kube::core::DynamicObject;
use kube::ResourceExt;
use metadata_injector_controller::client::{
    DeclarationStore, ResourceClient, ResourceTarget, StoreError,
};
use metadata_injector_controller::crd::{
    MetadataInjection, MetadataInjector, MetadataInjectorSpec, MetadataInjectorStatus,
    ResourceSelector,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Build a declaration in `namespace` with one selector
pub fn injector(namespace: &str, name: &str, selector: ResourceSelector) -> MetadataInjector {
    let mut injector = MetadataInjector::new(
        name,
        MetadataInjectorSpec {
            selectors: vec![selector],
            inject: MetadataInjection {
                labels: BTreeMap::from([("env".to_string(), "prod".to_string())]),
                annotations: BTreeMap::from([("owner".to_string(), "team-a".to_string())]),
            },
        },
    );
    injector.metadata.namespace = Some(namespace.to_string());
    injector.metadata.generation = Some(1);
    injector.metadata.resource_version = Some("1".to_string());
    injector
}

/// Selector for core-group Pods
pub fn pod_selector(namespaces: &[&str], names: &[&str]) -> ResourceSelector {
    ResourceSelector {
        kind: "Pod".to_string(),
        version: "v1".to_string(),
        namespaces: namespaces.iter().map(ToString::to_string).collect(),
        names: names.iter().map(ToString::to_string).collect(),
        ..Default::default()
    }
}

/// Set an annotation on a declaration
pub fn annotate(injector: &mut MetadataInjector, key: &str, value: &str) {
    injector
        .annotations_mut()
        .insert(key.to_string(), value.to_string());
}

/// Untyped Pod with the given labels
pub fn pod(namespace: &str, name: &str, labels: &[(&str, &str)]) -> DynamicObject {
    DynamicObject {
        types: Some(TypeMeta {
            api_version: "v1".to_string(),
            kind: "Pod".to_string(),
        }),
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: if labels.is_empty() {
                None
            } else {
                Some(
                    labels
                        .iter()
                        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                        .collect(),
                )
            },
            ..Default::default()
        },
        data: serde_json::json!({}),
    }
}

/// In-memory declaration store
///
/// Status patches are guarded by `metadata.resourceVersion` just like the API
/// server: a patch carrying a stale version is rejected with
/// [`StoreError::Conflict`]. Every accepted patch bumps the version.
#[derive(Debug, Default)]
pub struct FakeStore {
    injectors: Mutex<BTreeMap<(String, String), MetadataInjector>>,
    patched: Mutex<Vec<(String, MetadataInjectorStatus)>>,
    cleared: Mutex<Vec<(String, String)>>,
    fail_list: AtomicBool,
    failing_patches: Mutex<HashSet<String>>,
    list_calls: AtomicUsize,
}

impl FakeStore {
    pub fn new(injectors: Vec<MetadataInjector>) -> Self {
        let store = Self::default();
        for injector in injectors {
            store.insert(injector);
        }
        store
    }

    /// Add or replace a declaration, assigning a resourceVersion if missing
    pub fn insert(&self, mut injector: MetadataInjector) {
        if injector.metadata.resource_version.is_none() {
            injector.metadata.resource_version = Some("1".to_string());
        }
        let key = (
            injector.namespace().unwrap_or_default(),
            injector.name_any(),
        );
        self.injectors.lock().unwrap().insert(key, injector);
    }

    /// Simulate a concurrent writer bumping the stored resourceVersion
    pub fn bump_version(&self, namespace: &str, name: &str) {
        let mut injectors = self.injectors.lock().unwrap();
        let stored = injectors
            .get_mut(&(namespace.to_string(), name.to_string()))
            .unwrap();
        stored.metadata.resource_version = Some(next_version(stored));
    }

    /// Every status patch for a declaration with this name fails
    pub fn fail_patch(&self, name: &str) {
        self.failing_patches
            .lock()
            .unwrap()
            .insert(name.to_string());
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn stored(&self, namespace: &str, name: &str) -> MetadataInjector {
        self.injectors
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .unwrap()
    }

    /// `namespace/name` of every accepted status patch, in order
    pub fn patched_names(&self) -> Vec<String> {
        self.patched
            .lock()
            .unwrap()
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn patch_count(&self) -> usize {
        self.patched.lock().unwrap().len()
    }

    pub fn cleared(&self) -> Vec<(String, String)> {
        self.cleared.lock().unwrap().clone()
    }
}

fn next_version(injector: &MetadataInjector) -> String {
    let current: u64 = injector
        .metadata
        .resource_version
        .as_deref()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    (current + 1).to_string()
}

#[async_trait]
impl DeclarationStore for FakeStore {
    async fn list(&self) -> Result<Vec<MetadataInjector>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("list failed".to_string()));
        }
        Ok(self.injectors.lock().unwrap().values().cloned().collect())
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<MetadataInjector, StoreError> {
        self.injectors
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("MetadataInjector {namespace}/{name}")))
    }

    async fn patch_status(
        &self,
        injector: &MetadataInjector,
        status: &MetadataInjectorStatus,
    ) -> Result<(), StoreError> {
        let namespace = injector.namespace().unwrap_or_default();
        let name = injector.name_any();
        let what = format!("MetadataInjector {namespace}/{name}");
        if self.failing_patches.lock().unwrap().contains(&name) {
            return Err(StoreError::Unavailable(format!("patching {what} failed")));
        }

        let mut injectors = self.injectors.lock().unwrap();
        let stored = injectors
            .get_mut(&(namespace.clone(), name.clone()))
            .ok_or_else(|| StoreError::NotFound(what.clone()))?;
        if stored.metadata.resource_version != injector.metadata.resource_version {
            return Err(StoreError::Conflict(what));
        }

        stored.status = Some(status.clone());
        stored.metadata.resource_version = Some(next_version(stored));
        self.patched
            .lock()
            .unwrap()
            .push((format!("{namespace}/{name}"), status.clone()));
        Ok(())
    }

    async fn clear_annotation(
        &self,
        namespace: &str,
        name: &str,
        annotation: &str,
    ) -> Result<(), StoreError> {
        let mut injectors = self.injectors.lock().unwrap();
        let stored = injectors
            .get_mut(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| StoreError::NotFound(format!("MetadataInjector {namespace}/{name}")))?;
        stored.annotations_mut().remove(annotation);
        self.cleared
            .lock()
            .unwrap()
            .push((format!("{namespace}/{name}"), annotation.to_string()));
        Ok(())
    }
}

/// In-memory resource client keyed by (plural, namespace)
///
/// Listing `""` returns the objects of every namespace. Updates are recorded
/// and written back so later listings observe them.
#[derive(Debug, Default)]
pub struct FakeResources {
    objects: Mutex<HashMap<String, Vec<DynamicObject>>>,
    updates: Mutex<Vec<DynamicObject>>,
    failing_namespaces: Mutex<HashSet<String>>,
    failing_names: Mutex<HashSet<String>>,
    update_delay: Mutex<Option<Duration>>,
    list_calls: Mutex<Vec<(String, String)>>,
}

impl FakeResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, plural: &str, object: DynamicObject) {
        self.objects
            .lock()
            .unwrap()
            .entry(plural.to_string())
            .or_default()
            .push(object);
    }

    /// Listing this namespace fails
    pub fn fail_namespace(&self, namespace: &str) {
        self.failing_namespaces
            .lock()
            .unwrap()
            .insert(namespace.to_string());
    }

    /// Updating an object with this name fails
    pub fn fail_update(&self, name: &str) {
        self.failing_names.lock().unwrap().insert(name.to_string());
    }

    /// Every update sleeps this long before it is applied
    pub fn set_update_delay(&self, delay: Duration) {
        *self.update_delay.lock().unwrap() = Some(delay);
    }

    pub fn updates(&self) -> Vec<DynamicObject> {
        self.updates.lock().unwrap().clone()
    }

    pub fn updated_names(&self) -> Vec<String> {
        self.updates().iter().map(ResourceExt::name_any).collect()
    }

    /// `(plural, namespace)` pairs that were listed, in order
    pub fn list_calls(&self) -> Vec<(String, String)> {
        self.list_calls.lock().unwrap().clone()
    }

    pub fn object(&self, plural: &str, namespace: &str, name: &str) -> DynamicObject {
        self.objects
            .lock()
            .unwrap()
            .get(plural)
            .and_then(|objects| {
                objects
                    .iter()
                    .find(|o| {
                        o.name_any() == name && o.namespace().as_deref() == Some(namespace)
                    })
                    .cloned()
            })
            .unwrap()
    }
}

#[async_trait]
impl ResourceClient for FakeResources {
    async fn list(
        &self,
        target: &ResourceTarget,
        namespace: &str,
    ) -> Result<Vec<DynamicObject>, StoreError> {
        self.list_calls
            .lock()
            .unwrap()
            .push((target.plural.clone(), namespace.to_string()));
        if self.failing_namespaces.lock().unwrap().contains(namespace) {
            return Err(StoreError::Unavailable(format!(
                "listing {target} in {namespace} failed"
            )));
        }

        let objects = self.objects.lock().unwrap();
        Ok(objects
            .get(&target.plural)
            .map(|objects| {
                objects
                    .iter()
                    .filter(|o| {
                        namespace.is_empty() || o.namespace().as_deref() == Some(namespace)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update(
        &self,
        target: &ResourceTarget,
        _namespace: &str,
        object: &DynamicObject,
    ) -> Result<(), StoreError> {
        let delay = *self.update_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let name = object.name_any();
        if self.failing_names.lock().unwrap().contains(&name) {
            return Err(StoreError::Conflict(format!("{target} {name}")));
        }

        let mut objects = self.objects.lock().unwrap();
        if let Some(stored) = objects.get_mut(&target.plural).and_then(|objects| {
            objects
                .iter_mut()
                .find(|o| o.name_any() == name && o.namespace() == object.namespace())
        }) {
            *stored = object.clone();
        }
        self.updates.lock().unwrap().push(object.clone());
        Ok(())
    }
}
