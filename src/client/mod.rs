//! # Kubernetes Clients
//!
//! Seams between the scheduler and the Kubernetes API.
//!
//! - [`DeclarationStore`] reads `MetadataInjector` declarations and writes their status
//! - [`ResourceClient`] lists and updates arbitrary resources by group/version/plural
//!
//! The scheduler only talks to these traits; `kube.rs` holds the
//! implementations backed by a `kube::Client`.

mod kube;

pub use self::kube::{KubeDeclarationStore, KubeResourceClient};

use crate::crd::{MetadataInjector, MetadataInjectorStatus};
use ::kube::core::DynamicObject;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Errors returned by the Kubernetes-facing clients
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict writing {0}: the object has been modified")]
    Conflict(String),

    #[error("Kubernetes API error: {0}")]
    Api(#[from] ::kube::Error),

    #[error("{0}")]
    Unavailable(String),
}

impl StoreError {
    /// Map a kube error for `what`, translating 404 and 409 into their own variants
    pub fn from_kube(what: impl Into<String>, error: ::kube::Error) -> Self {
        match error {
            ::kube::Error::Api(api_err) if api_err.code == 404 => Self::NotFound(what.into()),
            ::kube::Error::Api(api_err) if api_err.code == 409 => Self::Conflict(what.into()),
            other => Self::Api(other),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Identity of a resource type as addressed on the API server
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceTarget {
    /// API group; empty for the core group
    pub group: String,
    pub version: String,
    pub kind: String,
    /// Plural name used in the URL path
    pub plural: String,
}

impl ResourceTarget {
    /// `apiVersion` value for objects of this type
    #[must_use]
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for ResourceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}/{}", self.version, self.plural)
        } else {
            write!(f, "{}/{}/{}", self.group, self.version, self.plural)
        }
    }
}

/// Access to `MetadataInjector` declarations
#[async_trait]
pub trait DeclarationStore: Send + Sync {
    /// List declarations across every namespace
    async fn list(&self) -> Result<Vec<MetadataInjector>, StoreError>;

    /// Fetch a single declaration
    async fn get(&self, namespace: &str, name: &str) -> Result<MetadataInjector, StoreError>;

    /// Write `status` for `injector`, guarded by the resourceVersion of the read copy
    async fn patch_status(
        &self,
        injector: &MetadataInjector,
        status: &MetadataInjectorStatus,
    ) -> Result<(), StoreError>;

    /// Remove an annotation from a declaration. Missing annotations are not an error.
    async fn clear_annotation(
        &self,
        namespace: &str,
        name: &str,
        annotation: &str,
    ) -> Result<(), StoreError>;
}

/// Untyped access to arbitrary resources
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// List objects of `target` in `namespace` (`""` lists every namespace)
    async fn list(
        &self,
        target: &ResourceTarget,
        namespace: &str,
    ) -> Result<Vec<DynamicObject>, StoreError>;

    /// Replace an object with its modified copy
    async fn update(
        &self,
        target: &ResourceTarget,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<(), StoreError>;
}
