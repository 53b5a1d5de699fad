//! # Initialization
//!
//! Controller startup: rustls, tracing, metrics, HTTP server, Kubernetes
//! client and the batch scheduler.

use crate::client::{DeclarationStore, KubeDeclarationStore, KubeResourceClient, ResourceClient};
use crate::config::{ControllerConfig, LogFormat};
use crate::controller::BatchScheduler;
use crate::crd::MetadataInjector;
use crate::observability;
use crate::runtime::context::WatchContext;
use crate::server::{bind, start_server, ServerState};
use anyhow::{Context, Result};
use kube::api::{Api, ListParams};
use kube::Client;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Everything `main` needs to run and later stop the controller
pub struct InitializationResult {
    pub config: ControllerConfig,
    pub injectors: Api<MetadataInjector>,
    pub scheduler: Arc<BatchScheduler>,
    pub context: Arc<WatchContext>,
    pub server_state: Arc<ServerState>,
    pub shutdown: CancellationToken,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("config", &self.config)
            .field(
                "server_ready",
                &self.server_state.is_ready.load(Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}

/// Install the tracing subscriber; `RUST_LOG` overrides the default filter
pub fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "metadata_injector_controller=info".into());

    let result = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };
    if let Err(e) = result {
        warn!("Tracing subscriber already initialized: {}", e);
    }
}

/// Initialize the controller runtime and start the scheduler
pub async fn initialize() -> Result<InitializationResult> {
    let config = ControllerConfig::from_env();
    init_tracing(config.log_format);

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider was already installed");
    }

    info!("Starting Metadata Injector Controller");
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(?config, "Loaded controller configuration");

    if config.enable_metrics {
        observability::metrics::register_metrics().context("Failed to register metrics")?;
    }

    let server_state = Arc::new(ServerState::new(config.enable_metrics));
    let listener = bind(config.metrics_port)
        .await
        .with_context(|| format!("Failed to bind HTTP server on port {}", config.metrics_port))?;
    let server_state_clone = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(e) = start_server(listener, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    // Fail fast when the CRD is missing instead of logging list errors every tick
    let injectors: Api<MetadataInjector> = Api::all(client.clone());
    let existing = injectors
        .list(&ListParams::default())
        .await
        .context("Failed to list MetadataInjector resources. Is the CRD installed?")?;
    info!(
        count = existing.items.len(),
        "Found existing MetadataInjector resources"
    );

    let store: Arc<dyn DeclarationStore> = Arc::new(KubeDeclarationStore::new(client.clone()));
    let resources: Arc<dyn ResourceClient> = Arc::new(KubeResourceClient::new(client));
    let scheduler = Arc::new(BatchScheduler::new(
        config.scheduler_config(),
        Arc::clone(&store),
        resources,
    ));
    scheduler.start();

    let context = Arc::new(WatchContext::new(
        Arc::clone(&scheduler),
        store,
        config.error_backoff_min(),
        config.error_backoff_max(),
    ));

    server_state.is_ready.store(true, Ordering::Relaxed);
    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        shutdown: scheduler.cancellation_token(),
        config,
        injectors,
        scheduler,
        context,
        server_state,
    })
}
