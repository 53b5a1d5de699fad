//! # Reconcile Command
//!
//! Requests an immediate run by touching an annotation the controller
//! watches for. The controller removes the annotation once the run is done.

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use kube::{api::Api, api::Patch, api::PatchParams, Client};
use metadata_injector_controller::constants::ANNOTATION_RECONCILE_REQUESTED_AT;
use metadata_injector_controller::crd::MetadataInjector;
use serde_json::json;

/// Trigger reconciliation by adding/updating an annotation
pub async fn reconcile_command(
    client: Client,
    name: String,
    namespace: Option<String>,
) -> Result<()> {
    let ns = namespace.as_deref().unwrap_or("default");
    let api: Api<MetadataInjector> = Api::namespaced(client, ns);

    println!("🔄 Triggering reconciliation for MetadataInjector '{ns}/{name}'...");

    let requested_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let patch = json!({
        "metadata": {
            "annotations": {
                ANNOTATION_RECONCILE_REQUESTED_AT: requested_at
            }
        }
    });

    api.patch(&name, &PatchParams::default(), &Patch::Merge(patch))
        .await
        .with_context(|| format!("Failed to trigger reconciliation for '{ns}/{name}'"))?;

    println!("✅ Reconciliation requested at {requested_at}");
    println!("   Check progress with: mictl status {name} --namespace {ns}");

    Ok(())
}
