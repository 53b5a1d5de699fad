//! # List Command
//!
//! Command to list MetadataInjector resources.

use anyhow::{Context, Result};
use kube::{api::Api, Client};
use metadata_injector_controller::controller::interval::is_auto_reconcile_disabled;
use metadata_injector_controller::crd::MetadataInjector;

/// List MetadataInjector resources
pub async fn list_command(client: Client, namespace: Option<String>) -> Result<()> {
    let api: Api<MetadataInjector> = if let Some(ns) = &namespace {
        println!("Listing MetadataInjector resources in namespace '{ns}'...");
        Api::namespaced(client, ns)
    } else {
        println!("Listing MetadataInjector resources in all namespaces...");
        Api::all(client)
    };

    let injectors = api
        .list(&kube::api::ListParams::default())
        .await
        .context("Failed to list MetadataInjector resources")?;

    if injectors.items.is_empty() {
        println!("No MetadataInjector resources found.");
        return Ok(());
    }

    println!(
        "\n{:<30} {:<20} {:<10} {:<10} {:<22} {:<22}",
        "NAME", "NAMESPACE", "SUSPENDED", "INTERVAL", "LAST SUCCESS", "NEXT RUN"
    );
    println!("{}", "-".repeat(118));

    for injector in injectors.items {
        let name = injector.metadata.name.as_deref().unwrap_or("<unknown>");
        let ns = injector.metadata.namespace.as_deref().unwrap_or("<unknown>");
        let suspended = if is_auto_reconcile_disabled(&injector) {
            "Yes"
        } else {
            "No"
        };

        let status = injector.status.as_ref();
        let interval = status.and_then(|s| s.interval.as_deref()).unwrap_or("-");
        let last = status
            .and_then(|s| s.last_successful_time.as_deref())
            .unwrap_or("-");
        let next = status
            .and_then(|s| s.next_scheduled_time.as_deref())
            .unwrap_or("-");

        println!("{name:<30} {ns:<20} {suspended:<10} {interval:<10} {last:<22} {next:<22}");
    }

    Ok(())
}
