//! # MICTL CLI
//!
//! Command-line interface for the Metadata Injector Controller.
//!
//! ```bash
//! # List MetadataInjector resources
//! mictl list
//!
//! # Show status of a MetadataInjector
//! mictl status team-labels --namespace default
//!
//! # Remove / re-add a MetadataInjector from the periodic batch
//! mictl suspend team-labels
//! mictl resume team-labels
//!
//! # Override the reconcile interval (or clear the override)
//! mictl set-interval team-labels 10m
//! mictl set-interval team-labels --clear
//!
//! # Run a MetadataInjector immediately
//! mictl reconcile team-labels
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kube::Client;

mod annotations;
mod list;
mod reconcile;
mod status;

/// Metadata Injector Controller CLI
#[derive(Parser)]
#[command(name = "mictl")]
#[command(about = "Metadata Injector Controller CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Kubernetes namespace (defaults to "default"; `list` defaults to all namespaces)
    #[arg(short, long, global = true)]
    namespace: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List MetadataInjector resources
    List,
    /// Show status of a MetadataInjector resource
    Status {
        /// Name of the MetadataInjector resource
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Exclude a MetadataInjector from the periodic batch
    Suspend {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Include a MetadataInjector in the periodic batch again
    Resume {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Override the reconcile interval of a MetadataInjector
    #[command(name = "set-interval")]
    SetInterval {
        #[arg(value_name = "NAME")]
        name: String,
        /// Duration such as 30s, 10m or 1h30m
        #[arg(value_name = "INTERVAL", required_unless_present = "clear")]
        interval: Option<String>,
        /// Remove the override and fall back to the controller default
        #[arg(long, conflicts_with = "interval")]
        clear: bool,
    },
    /// Run a MetadataInjector immediately
    Reconcile {
        #[arg(value_name = "NAME")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider was already installed");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mictl=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.")?;

    match cli.command {
        Commands::List => list::list_command(client, cli.namespace).await,
        Commands::Status { name } => status::status_command(client, name, cli.namespace).await,
        Commands::Suspend { name } => {
            annotations::suspend_command(client, name, cli.namespace).await
        }
        Commands::Resume { name } => annotations::resume_command(client, name, cli.namespace).await,
        Commands::SetInterval {
            name,
            interval,
            clear,
        } => {
            let interval = if clear { None } else { interval };
            annotations::set_interval_command(client, name, cli.namespace, interval).await
        }
        Commands::Reconcile { name } => {
            reconcile::reconcile_command(client, name, cli.namespace).await
        }
    }
}
