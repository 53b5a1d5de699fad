//! # MetadataInjector Spec
//!
//! Main CRD specification types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// MetadataInjector Custom Resource Definition
///
/// Declares a set of labels and annotations that the controller keeps applied
/// to every resource matched by one of its selectors.
///
/// # Example
///
/// ```yaml
/// apiVersion: core.k8s.ruso.dev/v1alpha1
/// kind: MetadataInjector
/// metadata:
///   name: team-labels
///   namespace: default
///   annotations:
///     metadata-injector.ruso.dev/reconcile-interval: 10m
/// spec:
///   selectors:
///     - kind: Deployment
///       group: apps
///       version: v1
///       namespaces: [payments, billing]
///   inject:
///     labels:
///       team: payments
///     annotations:
///       owner: payments@example.com
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "MetadataInjector",
    group = "core.k8s.ruso.dev",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::MetadataInjectorStatus",
    shortname = "mi",
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}, {"name":"Interval", "type":"string", "jsonPath":".status.interval"}, {"name":"Last Success", "type":"date", "jsonPath":".status.lastSuccessfulTime"}, {"name":"Next Run", "type":"date", "jsonPath":".status.nextScheduledTime"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MetadataInjectorSpec {
    /// Resource selectors, evaluated in order
    #[schemars(length(min = 1))]
    pub selectors: Vec<ResourceSelector>,
    /// Labels and annotations applied to every matched resource
    #[serde(default)]
    pub inject: MetadataInjection,
}

/// Selects a group of resources of a single type
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSelector {
    /// Resource kind, e.g. `Pod` or `Deployment`
    #[schemars(length(min = 1))]
    pub kind: String,
    /// API group; empty for the core group
    #[serde(default)]
    pub group: String,
    /// API version; defaults to `v1`
    #[serde(default)]
    pub version: String,
    /// Namespaces to search; empty means every namespace
    #[serde(default)]
    pub namespaces: Vec<String>,
    /// Resource names to match; empty means every name
    #[serde(default)]
    pub names: Vec<String>,
    /// Plural resource name used in the API path.
    /// When omitted the lowercased kind with an `s` suffix is used, which is
    /// wrong for kinds such as `Ingress` or `NetworkPolicy`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,
}

/// Metadata injected into matched resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetadataInjection {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl MetadataInjection {
    /// True when there is nothing to inject
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.annotations.is_empty()
    }
}
