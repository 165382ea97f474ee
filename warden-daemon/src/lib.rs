//! Warden Daemon Library
//!
//! Exposes the daemon's API and configuration for testing and for embedding
//! the sign-in service in another process.

pub mod api;
pub mod config;

pub use api::{ApiState, ServerHandle, start_server};
pub use config::{DaemonConfig, load_auth_config, load_config};
