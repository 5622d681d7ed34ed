//! Binary crate for the weather HTTP API.
//!
//! Bootstrap only: logging, configuration, provider construction and the
//! listen loop. All request logic lives in `weather-core`.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use weather_core::{Config, OpenWeatherClient};
use weather_server::app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = Config::load()?;

    // The environment wins over the config file for the credential.
    if let Ok(key) = std::env::var("OPENWEATHER_API_KEY") {
        config.api_key = Some(key);
    }

    let client = OpenWeatherClient::from_config(&config)?;
    let state = app::AppState { provider: Arc::new(client) };

    let addr = config.listen_addr().to_string();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("listening on {addr}");

    axum::serve(listener, app::router(state)).await?;

    Ok(())
}
