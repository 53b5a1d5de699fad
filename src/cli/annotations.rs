//! # Annotation Commands
//!
//! Suspend, resume and interval overrides are control annotations on the
//! `MetadataInjector` itself.

use anyhow::{Context, Result};
use kube::{api::Api, api::Patch, api::PatchParams, Client, ResourceExt};
use metadata_injector_controller::constants::{
    ANNOTATION_DISABLE_AUTO_RECONCILE, ANNOTATION_RECONCILE_INTERVAL,
};
use metadata_injector_controller::controller::interval::{
    format_duration, is_auto_reconcile_disabled, parse_duration,
};
use metadata_injector_controller::crd::MetadataInjector;
use serde_json::{json, Value};

async fn patch_annotation(
    client: Client,
    ns: &str,
    name: &str,
    annotation: &str,
    value: Value,
) -> Result<MetadataInjector> {
    let api: Api<MetadataInjector> = Api::namespaced(client, ns);
    let patch = json!({
        "metadata": { "annotations": { annotation: value } }
    });

    api.patch(name, &PatchParams::default(), &Patch::Merge(patch))
        .await
        .with_context(|| format!("Failed to patch MetadataInjector '{ns}/{name}'"))
}

async fn get(client: Client, ns: &str, name: &str) -> Result<MetadataInjector> {
    let api: Api<MetadataInjector> = Api::namespaced(client, ns);
    api.get(name)
        .await
        .with_context(|| format!("Failed to get MetadataInjector '{ns}/{name}'"))
}

/// Exclude a MetadataInjector from the periodic batch
pub async fn suspend_command(client: Client, name: String, namespace: Option<String>) -> Result<()> {
    let ns = namespace.as_deref().unwrap_or("default");

    println!("⏸️  Suspending automatic reconciliation for MetadataInjector '{ns}/{name}'...");

    let resource = get(client.clone(), ns, &name).await?;
    if is_auto_reconcile_disabled(&resource) {
        println!("   ℹ️  Resource is already suspended");
        return Ok(());
    }

    patch_annotation(
        client,
        ns,
        &name,
        ANNOTATION_DISABLE_AUTO_RECONCILE,
        json!("true"),
    )
    .await?;

    println!("✅ Automatic reconciliation suspended");
    println!("   Resource: {ns}/{name}");
    println!("\nThe resource can still be run on demand with:");
    println!("   mictl reconcile {name} --namespace {ns}");

    Ok(())
}

/// Include a MetadataInjector in the periodic batch again
pub async fn resume_command(client: Client, name: String, namespace: Option<String>) -> Result<()> {
    let ns = namespace.as_deref().unwrap_or("default");

    println!("▶️  Resuming automatic reconciliation for MetadataInjector '{ns}/{name}'...");

    let resource = get(client.clone(), ns, &name).await?;
    if !is_auto_reconcile_disabled(&resource) {
        println!("   ℹ️  Resource is already active (not suspended)");
        return Ok(());
    }

    patch_annotation(
        client,
        ns,
        &name,
        ANNOTATION_DISABLE_AUTO_RECONCILE,
        Value::Null,
    )
    .await?;

    println!("✅ Automatic reconciliation resumed");
    println!("   Resource: {ns}/{name}");

    Ok(())
}

/// Set or clear the reconcile interval override
pub async fn set_interval_command(
    client: Client,
    name: String,
    namespace: Option<String>,
    interval: Option<String>,
) -> Result<()> {
    let ns = namespace.as_deref().unwrap_or("default");

    let Some(interval) = interval else {
        patch_annotation(client, ns, &name, ANNOTATION_RECONCILE_INTERVAL, Value::Null).await?;
        println!("✅ Interval override removed from '{ns}/{name}', the controller default applies");
        return Ok(());
    };

    // The controller silently falls back to the default for invalid values, so reject them here
    let duration = parse_duration(&interval)
        .filter(|d| !d.is_zero())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid interval '{interval}'. Expected a positive duration such as 30s, 10m or 1h30m"
            )
        })?;

    let updated = patch_annotation(
        client,
        ns,
        &name,
        ANNOTATION_RECONCILE_INTERVAL,
        json!(interval),
    )
    .await?;

    println!(
        "✅ Reconcile interval of '{ns}/{}' set to {}",
        updated.name_any(),
        format_duration(duration)
    );

    Ok(())
}
