//! FieldCapture - naming and session sequencing for field capture sessions
//!
//! Headless entry point. It initializes:
//! - Logging infrastructure (daily file rotation + optional console output)
//! - Tokio async runtime for filesystem operations
//! - Bootstrap configuration (`fieldcapture.yaml` + `FIELDCAPTURE_*` variables)
//! - The [`SessionController`], which resolves settings and opens the session
//!
//! # Execution Flow
//!
//! 1. Load bootstrap config (writing the default file on first run)
//! 2. Initialize logging → <log_dir>/<log_prefix>.<date>
//! 3. Create the tokio runtime
//! 4. Start the controller: load settings, resolve, open the last/fixed folder
//! 5. Log the session list and the next capture index
//! 6. Log metrics and shut down

use anyhow::{Context, Result};
use camino::Utf8Path;
use fieldcapture::config::{
    APP_CONFIG_FILE, load_app_config, log_app_config, write_default_app_config,
};
use fieldcapture::{APP_NAME, ConfigManager, Metrics, SessionController, SessionStore, VERSION};
use std::sync::Arc;

fn main() -> Result<()> {
    let config_path = Utf8Path::new(APP_CONFIG_FILE);
    let first_run = write_default_app_config(config_path)?;
    let app_config = load_app_config(config_path)?;

    let _guard = fieldcapture::logging::setup_from_config(&app_config)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    if first_run {
        tracing::info!("Wrote default configuration to {}", config_path);
    }
    log_app_config(&app_config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("fieldcapture-worker")
        .build()
        .context("Failed to build tokio runtime")?;

    let metrics = Arc::new(Metrics::new());

    let result = runtime.block_on(async {
        let config_manager = Arc::new(ConfigManager::new(&app_config.config_dir)?);
        let store = SessionStore::new(app_config.base_dir.clone());

        let controller =
            SessionController::startup(config_manager, store, Arc::clone(&metrics)).await?;

        for session in controller.list_sessions().await? {
            tracing::info!(
                "Session {:<32} {}{}",
                session.display_name(),
                session.path,
                if session.is_empty { " (empty)" } else { "" }
            );
        }

        let snapshot = controller.state().snapshot();
        match snapshot.session.current_index() {
            Some(index) => tracing::info!(
                "Next capture in {}: {:?} ({} mode)",
                snapshot.session.session.display_name(),
                index,
                snapshot.session.labeling_mode
            ),
            None => tracing::info!(
                "Next capture in {} needs a text label",
                snapshot.session.session.display_name()
            ),
        }

        anyhow::Ok(())
    });

    if let Err(e) = &result {
        tracing::error!("Startup failed: {:#}", e);
    }

    metrics.log_summary();
    runtime.shutdown_timeout(std::time::Duration::from_secs(5));

    tracing::info!("Shutdown complete");
    result
}
