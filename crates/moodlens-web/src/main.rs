//! moodlens-web: Axum web server entry point.
//! Loads config, wires the strategy registry to the engine, and serves the API.

mod chat;
mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use moodlens_core::{AnalysisEngine, EngineConfig, EngineOptions, SharedMethod, StrategyRegistry};

use chat::ChatCompletionsBackend;
use server::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let project_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let config_path = project_root.join("config.yaml");
    let config = EngineConfig::load_or_default(&config_path).unwrap_or_else(|e| {
        warn!("Invalid config ({:#}), using defaults", e);
        EngineConfig::default()
    });

    let backend = ChatCompletionsBackend::new(config.llm.clone())?;
    let registry = StrategyRegistry::with_defaults(Arc::new(backend));
    let method = SharedMethod::new(config.method);
    let engine = AnalysisEngine::new(
        registry,
        Arc::new(method.clone()),
        EngineOptions::from(&config),
    );

    info!(
        method = %config.method,
        model = %config.llm.model,
        local = config.llm.is_local(),
        "Analysis engine ready"
    );

    let state = Arc::new(AppState { engine, method });
    let app = server::router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);
    let addr = format!("0.0.0.0:{}", port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://localhost:{}", port);

    // Graceful shutdown on Ctrl+C
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    info!("Server stopped.");
    Ok(())
}
