//! Kubernetes-backed implementations of the client traits.

use super::{DeclarationStore, ResourceClient, ResourceTarget, StoreError};
use crate::constants::FIELD_MANAGER;
use crate::crd::{MetadataInjector, MetadataInjectorStatus};
use async_trait::async_trait;
use kube::api::{ListParams, Patch, PatchParams, PostParams};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind, TypeMeta};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use tracing::debug;

/// Declaration store backed by `Api<MetadataInjector>`
#[derive(Clone)]
pub struct KubeDeclarationStore {
    client: Client,
}

impl std::fmt::Debug for KubeDeclarationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeDeclarationStore").finish_non_exhaustive()
    }
}

impl KubeDeclarationStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DeclarationStore for KubeDeclarationStore {
    async fn list(&self) -> Result<Vec<MetadataInjector>, StoreError> {
        let api: Api<MetadataInjector> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<MetadataInjector, StoreError> {
        let api: Api<MetadataInjector> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| StoreError::from_kube(format!("MetadataInjector {namespace}/{name}"), e))
    }

    async fn patch_status(
        &self,
        injector: &MetadataInjector,
        status: &MetadataInjectorStatus,
    ) -> Result<(), StoreError> {
        let name = injector.name_any();
        let namespace = injector.namespace().unwrap_or_default();
        let api: Api<MetadataInjector> = Api::namespaced(self.client.clone(), &namespace);

        // resourceVersion in the body turns the merge patch into a conditional write
        let patch = json!({
            "metadata": { "resourceVersion": injector.resource_version() },
            "status": status,
        });

        api.patch_status(
            &name,
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&patch),
        )
        .await
        .map_err(|e| StoreError::from_kube(format!("MetadataInjector {namespace}/{name}"), e))?;

        debug!(
            resource.name = %name,
            resource.namespace = %namespace,
            "status updated"
        );
        Ok(())
    }

    async fn clear_annotation(
        &self,
        namespace: &str,
        name: &str,
        annotation: &str,
    ) -> Result<(), StoreError> {
        let api: Api<MetadataInjector> = Api::namespaced(self.client.clone(), namespace);
        // A null value removes the key in a JSON merge patch
        let patch = json!({
            "metadata": { "annotations": { annotation: null } }
        });

        api.patch(
            name,
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&patch),
        )
        .await
        .map_err(|e| StoreError::from_kube(format!("MetadataInjector {namespace}/{name}"), e))?;
        Ok(())
    }
}

/// Resource client backed by `Api<DynamicObject>`
#[derive(Clone)]
pub struct KubeResourceClient {
    client: Client,
}

impl std::fmt::Debug for KubeResourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeResourceClient").finish_non_exhaustive()
    }
}

impl KubeResourceClient {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, target: &ResourceTarget, namespace: &str) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk(&target.group, &target.version, &target.kind);
        let resource = ApiResource::from_gvk_with_plural(&gvk, &target.plural);
        if namespace.is_empty() {
            Api::all_with(self.client.clone(), &resource)
        } else {
            Api::namespaced_with(self.client.clone(), namespace, &resource)
        }
    }
}

#[async_trait]
impl ResourceClient for KubeResourceClient {
    async fn list(
        &self,
        target: &ResourceTarget,
        namespace: &str,
    ) -> Result<Vec<DynamicObject>, StoreError> {
        let list = self
            .api(target, namespace)
            .list(&ListParams::default())
            .await
            .map_err(|e| StoreError::from_kube(format!("{target} in {namespace:?}"), e))?;
        Ok(list.items)
    }

    async fn update(
        &self,
        target: &ResourceTarget,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<(), StoreError> {
        let name = object.name_any();
        // Objects from a cluster-wide list still live in their own namespace
        let object_namespace = object
            .namespace()
            .unwrap_or_else(|| namespace.to_string());

        let mut body = object.clone();
        if body.types.is_none() {
            body.types = Some(TypeMeta {
                api_version: target.api_version(),
                kind: target.kind.clone(),
            });
        }

        self.api(target, &object_namespace)
            .replace(&name, &PostParams::default(), &body)
            .await
            .map_err(|e| StoreError::from_kube(format!("{target} {object_namespace}/{name}"), e))?;
        Ok(())
    }
}
