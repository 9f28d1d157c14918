use anyhow::{self, Error as AnyhowError};
use orchestra::{OrchestraConfig, OrchestraError, Runtime};
use server::{AppState, routes};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, prelude::*};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Orchestra(#[from] OrchestraError),
    #[error(transparent)]
    Other(#[from] AnyhowError),
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // Load `.env` so local development picks up API keys
    dotenv::dotenv().ok();

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,server={level},orchestra={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(filter_string)
        .map_err(|e| anyhow::anyhow!("Failed to create tracing filter: {}", e))?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let config = OrchestraConfig::from_env()?;
    tracing::info!(
        "Using {} ({}) with {:?} embeddings, memory at {}",
        config.llm.provider,
        config.llm.model,
        config.embedding.provider,
        config.memory.store_url
    );
    let addr = format!("{}:{}", config.host, config.port);

    let runtime = Runtime::from_config(config).await?;
    let app = routes::router(AppState::new(runtime));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
