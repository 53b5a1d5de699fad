//! # Selector Resolution
//!
//! Turns a [`ResourceSelector`] into the resource type to address, the
//! namespaces to list, and the name allow-list.

use crate::client::ResourceTarget;
use crate::crd::ResourceSelector;

/// Namespace value meaning "every namespace"
pub const ALL_NAMESPACES: &str = "";

/// Version assumed when a selector leaves it empty
const DEFAULT_VERSION: &str = "v1";

/// A selector resolved against API naming rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSelector {
    pub target: ResourceTarget,
    /// Never empty; `[""]` stands for every namespace
    pub namespaces: Vec<String>,
    /// Empty means every name is accepted
    pub names: Vec<String>,
}

impl ResolvedSelector {
    /// Whether an object called `name` is selected
    #[must_use]
    pub fn accepts(&self, name: &str) -> bool {
        self.names.is_empty() || self.names.iter().any(|n| n == name)
    }
}

/// Resolve a selector. Never fails; unknown kinds surface later as list errors.
#[must_use]
pub fn resolve_selector(selector: &ResourceSelector) -> ResolvedSelector {
    let plural = match selector.plural.as_deref().map(str::trim) {
        Some(plural) if !plural.is_empty() => plural.to_string(),
        _ => format!("{}s", selector.kind.to_lowercase()),
    };
    let version = if selector.version.is_empty() {
        DEFAULT_VERSION.to_string()
    } else {
        selector.version.clone()
    };
    let namespaces = if selector.namespaces.is_empty() {
        vec![ALL_NAMESPACES.to_string()]
    } else {
        selector.namespaces.clone()
    };

    ResolvedSelector {
        target: ResourceTarget {
            group: selector.group.clone(),
            version,
            kind: selector.kind.clone(),
            plural,
        },
        namespaces,
        names: selector.names.clone(),
    }
}
