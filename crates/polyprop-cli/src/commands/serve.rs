//! Serve command implementation.
//!
//! Loads the model artifacts, opens the description cache and the reference
//! dataset, then serves the polyprop HTTP API until Ctrl+C.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use polyprop_api::{create_router, AppState};
use polyprop_core::{PredictionService, ReferenceDataset};
use polyprop_describe::{build_generator, DescriptionService, FileDescriptionCache};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::Config;

pub async fn execute(config: &Config, host: IpAddr) -> Result<()> {
    let predictor = PredictionService::load(&config.model_dir).with_context(|| {
        format!(
            "Failed to load model artifacts from {}",
            config.model_dir.display()
        )
    })?;

    let cache = FileDescriptionCache::open(&config.cache_path)
        .await
        .with_context(|| {
            format!(
                "Failed to open description cache {}",
                config.cache_path.display()
            )
        })?;
    let generator = build_generator(config.generator_config())
        .context("Failed to build description generator")?;
    let describer = DescriptionService::new(Arc::new(cache), generator, predictor.model_version())
        .with_replay_delay(config.replay_delay());

    let mut state = AppState::new(predictor.clone(), describer);
    match config.dataset.as_deref() {
        Some(path) => match ReferenceDataset::load(path) {
            Ok(dataset) => state = state.with_dataset(dataset),
            Err(e) => warn!(path = %path.display(), error = %e, "reference_dataset_unavailable"),
        },
        None => info!("reference_dataset_disabled"),
    }

    let app = create_router(Arc::new(state));
    let addr = SocketAddr::new(host, config.port);

    // Print server info
    println!();
    println!("🚀 polyprop server");
    println!("   URL:    http://{}", addr);
    println!("   Model:  {} ({})", config.model_dir.display(), predictor.model_version());
    println!("   LLM:    {} {} at {}", config.llm_backend, config.llm_model, config.llm_url);
    println!("   Cache:  {}", config.cache_path.display());
    println!();
    println!("   Press Ctrl+C to stop");
    println!();

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "server_listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server_stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl_c_handler_failed");
        std::future::pending::<()>().await;
    }
}
