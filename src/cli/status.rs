//! # Status Command
//!
//! Command to show detailed status of a MetadataInjector resource.

use anyhow::{Context, Result};
use kube::{api::Api, Client};
use metadata_injector_controller::constants::ANNOTATION_RECONCILE_INTERVAL;
use metadata_injector_controller::controller::interval::is_auto_reconcile_disabled;
use metadata_injector_controller::controller::selector::resolve_selector;
use metadata_injector_controller::crd::MetadataInjector;

/// Show detailed status of a MetadataInjector resource
pub async fn status_command(client: Client, name: String, namespace: Option<String>) -> Result<()> {
    let ns = namespace.as_deref().unwrap_or("default");

    println!("📊 Status for MetadataInjector '{ns}/{name}'");
    println!();

    let api: Api<MetadataInjector> = Api::namespaced(client, ns);
    let injector = api
        .get(&name)
        .await
        .with_context(|| format!("Failed to get MetadataInjector '{ns}/{name}'"))?;

    println!("Resource Information:");
    println!("  Name: {name}");
    println!("  Namespace: {ns}");
    if let Some(generation) = injector.metadata.generation {
        println!("  Generation: {generation}");
    }

    println!();
    println!("Schedule:");
    println!(
        "  Auto Reconcile: {}",
        if is_auto_reconcile_disabled(&injector) {
            "Suspended"
        } else {
            "Active"
        }
    );
    let interval_override = injector
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(ANNOTATION_RECONCILE_INTERVAL));
    println!(
        "  Interval Override: {}",
        interval_override.map_or("<none>", String::as_str)
    );

    println!();
    println!("Selectors:");
    for selector in &injector.spec.selectors {
        let resolved = resolve_selector(selector);
        let namespaces = if selector.namespaces.is_empty() {
            "<all>".to_string()
        } else {
            selector.namespaces.join(", ")
        };
        let names = if selector.names.is_empty() {
            "<all>".to_string()
        } else {
            selector.names.join(", ")
        };
        println!("  - {} ({})", selector.kind, resolved.target);
        println!("    Namespaces: {namespaces}");
        println!("    Names: {names}");
    }

    println!();
    println!("Inject:");
    for (key, value) in &injector.spec.inject.labels {
        println!("  label {key}={value}");
    }
    for (key, value) in &injector.spec.inject.annotations {
        println!("  annotation {key}={value}");
    }

    println!();
    println!("Status:");
    let Some(status) = &injector.status else {
        println!("  <not reconciled yet>");
        return Ok(());
    };
    let show = |label: &str, value: Option<&String>| {
        println!("  {label}: {}", value.map_or("-", String::as_str));
    };
    show("Interval", status.interval.as_ref());
    show("Last Scheduled", status.last_scheduled_time.as_ref());
    show("Last Success", status.last_successful_time.as_ref());
    show("Next Run", status.next_scheduled_time.as_ref());
    if let Some(observed) = status.observed_generation {
        println!("  Observed Generation: {observed}");
    }

    if !status.conditions.is_empty() {
        println!();
        println!("Conditions:");
        for condition in &status.conditions {
            println!(
                "  {}: {} ({})",
                condition.r#type,
                condition.status,
                condition.reason.as_deref().unwrap_or("-")
            );
            if let Some(message) = &condition.message {
                println!("    {message}");
            }
        }
    }

    Ok(())
}
