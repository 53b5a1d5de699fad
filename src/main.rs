//! # Metadata Injector Controller
//!
//! A Kubernetes controller that keeps declared labels and annotations applied
//! to dynamically selected resources.
//!
//! Each `MetadataInjector` names a set of resource selectors and the metadata
//! to inject. A batch scheduler revisits every declaration on its own
//! interval (5m by default, overridable with the
//! `metadata-injector.ruso.dev/reconcile-interval` annotation), and the watch
//! loop runs new or changed declarations immediately.
//!
//! Configuration comes from environment variables, see
//! [`ControllerConfig`](metadata_injector_controller::config::ControllerConfig).

use anyhow::Result;
use metadata_injector_controller::runtime::initialization::initialize;
use metadata_injector_controller::runtime::watch_loop::run_watch_loop;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;

    run_watch_loop(
        init.injectors.clone(),
        Arc::clone(&init.context),
        Arc::clone(&init.server_state),
        init.config.watch_restart_delay(),
        init.shutdown.clone(),
    )
    .await;

    info!("Waiting for in-flight jobs to finish...");
    init.scheduler.stop().await;
    info!("Controller stopped gracefully");
    Ok(())
}
