//! Cover type prediction service
//!
//! Serves the four prediction strategies over HTTP, alongside health and
//! Prometheus endpoints.

use anyhow::{Context, Result};
use covtype_server::{api, config::ServerConfig};
use serving_lib::{
    backend::ModelCache,
    health::{components, HealthRegistry},
    observability::StructuredLogger,
    Dispatcher,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = ServerConfig::load()?;
    info!(
        dataset = %config.dataset_path.display(),
        model = %config.model_path.display(),
        policy = ?config.training_policy,
        "Service configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::DISPATCHER).await;
    health_registry.register(components::DATASET).await;
    health_registry.register(components::MODEL_CACHE).await;

    let logger = StructuredLogger::new("covtype-server");

    let cache = Arc::new(ModelCache::new());
    let dispatcher = Arc::new(Dispatcher::with_onnx(config.dispatcher_config(), cache));

    if !config.dataset_path.exists() {
        health_registry
            .set_degraded(
                components::DATASET,
                format!("{} not found", config.dataset_path.display()),
            )
            .await;
    }

    if config.preload_model {
        let preload = Arc::clone(&dispatcher);
        match tokio::task::spawn_blocking(move || preload.load_model())
            .await
            .context("Model preload task failed")?
        {
            Ok(_) => health_registry.set_healthy(components::MODEL_CACHE).await,
            Err(e) => {
                warn!(error = %e, "Model preload failed, neural-network option unavailable");
                health_registry
                    .set_degraded(components::MODEL_CACHE, e.to_string())
                    .await;
            }
        }
    }

    let app_state = Arc::new(api::AppState::new(dispatcher, health_registry.clone()));
    health_registry.set_ready(true).await;
    logger.log_startup(SERVICE_VERSION, config.port);

    let server = tokio::spawn(api::serve(config.port, app_state));

    tokio::select! {
        result = server => {
            result.context("API server task panicked")??;
            logger.log_shutdown("server stopped");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
