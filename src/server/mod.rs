pub mod api;
pub mod pages;

use anyhow::{Context as _, Result};
use colored::*;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
pub use api::{RelayState, router};

/// Bind the configured address and run the relay until the process exits.
pub async fn start(config: &Config) -> Result<()> {
    let listener = TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    let addr = listener.local_addr()?;
    println!(
        "{} Relay running at {} (app key {}, channel {})",
        "✓".green(),
        format!("http://{addr}").bright_blue(),
        config.relay.app_key.bright_yellow(),
        config.channel.bright_white()
    );
    serve(listener, RelayState::from_config(config)).await
}

/// Serve on an already bound listener.
pub async fn serve(listener: TcpListener, state: RelayState) -> Result<()> {
    info!(addr = ?listener.local_addr().ok(), channel = %state.channel, "relay listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
