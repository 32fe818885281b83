//! Enrollwise: Clinical Trial Enrollment Predictor
//!
//! Main entry point for the HTTP service.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use enrollwise::adapters::sanitize::SanitizingMakeWriter;
use enrollwise::adapters::{BundleLoader, BundleVerifier};
use enrollwise::api::{router, AppState};
use enrollwise::config::AppConfig;
use enrollwise::PredictionService;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    // Keep the guard alive for the whole process or buffered lines are lost.
    let (writer, _guard) = if config.log.use_file() {
        if let Some(parent) = config.log.file.parent() {
            // Best-effort: the open below reports the real failure.
            let _ = std::fs::create_dir_all(parent);
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log.file)
            .with_context(|| format!("opening log file {}", config.log.file.display()))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    tracing::info!("Starting Enrollwise {}...", env!("CARGO_PKG_VERSION"));

    let mut loader = BundleLoader::new(&config.model_dir);
    if let Some(b64) = config.integrity.public_key_b64.as_deref() {
        loader = loader.with_verifier(BundleVerifier::from_b64(b64)?);
    }
    let bundle = loader.load().with_context(|| {
        format!("loading model bundle from {}", config.model_dir.display())
    })?;
    let service = PredictionService::new(Arc::new(bundle));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, router(AppState::new(service)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Enrollwise shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {err}");
    }
}
