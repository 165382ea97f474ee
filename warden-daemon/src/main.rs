//! Warden Daemon
//!
//! Local sign-in service. Reads `JWT_SECRET`, `GOOGLE_CLIENT_ID`,
//! `GOOGLE_CLIENT_SECRET`, `BACKEND_URL` and `PORT` from the environment and
//! refuses to start when any of them is missing.
//!
//! # Running
//!
//! ```bash
//! cargo run -p warden-daemon
//! # or after install:
//! wardend
//! ```

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};
use warden_daemon::{ApiState, DaemonConfig, load_auth_config, load_config, start_server};

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    init_logging(&config.log_level);

    info!("Starting Warden daemon...");
    info!("Loaded configuration from {:?}", config.config_path);

    run_daemon(config).await
}

fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt().with_env_filter(filter).with_target(false).init();
}

async fn run_daemon(config: DaemonConfig) -> Result<()> {
    let auth = load_auth_config()?;
    info!("Provider callbacks rooted at {}:{}", auth.base_url(), auth.port);

    let state = ApiState::new(&config, &auth)?;
    let server_handle = start_server(&config.socket_path, state).await?;

    info!("Daemon running on {:?}. Press Ctrl+C to stop.", config.socket_path);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping server...");

    server_handle.stop().await?;
    server_handle.stopped().await;

    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
        info!("Socket file removed");
    }

    info!("Daemon stopped");
    Ok(())
}
