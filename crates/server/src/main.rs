use anyhow::Context;
use inference::{DetectionService, backend::ort::OrtBackend};
use server::{AppState, ServerConfig, StoragePaths, logging::setup_logging, router};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;

    let _telemetry = setup_logging(&config)?;

    tracing::info!(
        config = ?config,
        "Loaded configuration"
    );

    let storage = StoragePaths::new(&config.static_root);
    storage.ensure_dirs()?;

    tracing::info!("Loading detection model");
    let backend = OrtBackend::load_model_with_provider(
        &config.inference.model_path,
        config.inference.execution_provider,
        config.inference.intra_threads,
    )
    .context("Failed to load detection model - check MODEL_PATH")?;
    tracing::info!("Model loaded successfully");

    let detector = DetectionService::new(backend, &config.inference)?;
    let state = AppState::new(Arc::new(detector), storage);
    let app = router(state, config.max_upload_bytes);

    let listener = TcpListener::bind(config.addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.addr()))?;
    tracing::info!("HTTP server listening on {}", config.addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for SIGINT");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
