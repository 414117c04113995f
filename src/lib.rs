pub mod api;
pub mod config;
pub mod locale;
pub mod models;
pub mod pipeline;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::api::ApiContext;
use crate::config::{AppConfig, ConfigError};
use crate::pipeline::llm::ModelApiError;
use crate::pipeline::DocumentAnalyzer;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cannot create model client: {0}")]
    Model(#[from] ModelApiError),

    #[error("Cannot start async runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("Cannot start API server: {0}")]
    Server(String),
}

/// Load configuration, wire the analyzer and serve the API until Ctrl-C.
pub fn run() -> Result<(), StartupError> {
    let dotenv = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    match dotenv {
        Ok(path) => tracing::info!(path = %path.display(), "Loaded environment file"),
        Err(e) if e.not_found() => tracing::debug!("No .env file"),
        Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env file"),
    }

    let config = Arc::new(AppConfig::from_env()?);
    tracing::debug!(?config, "Configuration loaded");

    // The blocking HTTP client must be built and dropped outside the runtime
    let analyzer = Arc::new(DocumentAnalyzer::from_config(&config)?);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(config, analyzer.clone()))
}

async fn serve(config: Arc<AppConfig>, analyzer: Arc<DocumentAnalyzer>) -> Result<(), StartupError> {
    let model = analyzer.model_name().to_string();
    let ctx = ApiContext::new(config.clone(), analyzer);
    let server = api::start_api_server(ctx, config.bind_addr)
        .await
        .map_err(StartupError::Server)?;

    tracing::info!(
        addr = %server.session.server_addr,
        model = %model,
        session_id = %server.session.session_id,
        "FinDoc API listening"
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for Ctrl-C: {e}");
    }

    server.stop().await;
    Ok(())
}
