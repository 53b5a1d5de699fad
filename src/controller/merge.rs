//! # Metadata Merge
//!
//! Overlays injected labels and annotations onto an object's metadata.
//! Keys are set or overwritten, never removed.

use crate::crd::MetadataInjection;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Overlay `desired` onto `target`, creating the map when needed.
///
/// Returns true if any key was added or changed. An empty `desired` leaves
/// `target` untouched, including an absent map.
pub fn merge_into(
    target: &mut Option<BTreeMap<String, String>>,
    desired: &BTreeMap<String, String>,
) -> bool {
    if desired.is_empty() {
        return false;
    }

    let map = target.get_or_insert_with(BTreeMap::new);
    let mut changed = false;
    for (key, value) in desired {
        if map.get(key) != Some(value) {
            map.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

/// Apply injected labels and annotations to `meta`.
/// Returns true if either map changed.
pub fn merge_metadata(meta: &mut ObjectMeta, inject: &MetadataInjection) -> bool {
    let labels_changed = merge_into(&mut meta.labels, &inject.labels);
    let annotations_changed = merge_into(&mut meta.annotations, &inject.annotations);
    labels_changed || annotations_changed
}
