use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

use gateway::{router, AppState};
use relay_core::config::WEBHOOK_URL_KEY;
use relay_core::RelayConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging Setup
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .compact()
        .init();

    info!("Generate Relay Initializing...");

    // 2. Load Configuration (once; nothing else reads the environment)
    let config = RelayConfig::from_env().context("Failed to load relay configuration")?;
    if config.webhook_url.is_none() {
        warn!(
            "{} is not set; POST requests will fail until it is configured",
            WEBHOOK_URL_KEY
        );
    }
    info!("Default tool for untagged submissions: {}", config.policy.default_tool);

    // 3. Build State (webhook client included)
    let state = AppState::from_config(&config).context("Failed to build webhook client")?;

    // 4. Define Routes
    let app = router(state);

    // 5. Start Server
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Relay listening on {}...", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
