//! PBT Contest Server
//!
//! Serves the contest engine over WebSocket.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pbt::{
    VERSION,
    network::{AuthConfig, ContestServer, ServerConfig},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("PBT Server v{}", VERSION);

    let config = ServerConfig::from_env().context("loading server configuration")?;
    let auth = AuthConfig::from_env();
    info!("Minimum contest value: {}", config.contest.min_value);
    if let Some(path) = &config.state_path {
        info!("State file: {}", path.display());
    }

    let server = std::sync::Arc::new(
        ContestServer::new(config, auth).context("initializing contest server")?,
    );

    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
            signal_server.shutdown();
        }
    });

    server.run().await.context("server terminated")?;
    info!("Server stopped");
    Ok(())
}
