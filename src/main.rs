use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use voice_backend::{create_app, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env early so RUST_LOG from it reaches the filter
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("voice_backend=debug,tower_http=debug")),
        )
        .init();

    let config = Config::discover()?;

    let app_state = AppState::new(config.clone())?;
    info!("Serving audio from {}", app_state.audio_store.dir().display());

    let app = create_app(app_state);

    let system_config = &config.system_config;
    let listener = tokio::net::TcpListener::bind((system_config.host.as_str(), system_config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", system_config.host, system_config.port))?;
    info!("Starting server on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
