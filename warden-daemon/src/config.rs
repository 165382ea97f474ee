//! Daemon configuration handling.
//!
//! Process settings (socket, data directory, log level) come from
//! `daemon.toml`; signing and provider settings come from the environment and
//! are validated by [`warden_core::AuthConfig`] before the server starts.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use warden_core::AuthConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Path to the Unix socket.
    pub socket_path: PathBuf,

    /// Path to the configuration file that was loaded.
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory holding `principals.json`.
    pub data_dir: PathBuf,

    /// Logging level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to expose the Google code exchange methods.
    #[serde(default = "default_enable_exchange")]
    pub enable_exchange: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_enable_exchange() -> bool {
    true
}

impl Default for DaemonConfig {
    fn default() -> Self {
        let dirs = project_dirs();
        let data_dir = dirs
            .as_ref()
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".warden"));

        let socket_path = dirs
            .as_ref()
            .map(|d| d.runtime_dir().unwrap_or(d.data_dir()).join("warden.sock"))
            .unwrap_or_else(|| PathBuf::from("/tmp/warden.sock"));

        Self {
            socket_path,
            config_path: PathBuf::new(),
            data_dir,
            log_level: default_log_level(),
            enable_exchange: default_enable_exchange(),
        }
    }
}

impl DaemonConfig {
    /// Location of the principal store inside the data directory.
    pub fn principals_path(&self) -> PathBuf {
        self.data_dir.join("principals.json")
    }
}

/// Load configuration from the default location or create defaults.
pub fn load_config() -> Result<DaemonConfig> {
    let config_path = project_dirs()
        .map(|d| d.config_dir().join("daemon.toml"))
        .unwrap_or_else(|| PathBuf::from("warden-daemon.toml"));

    load_config_from(&config_path)
}

/// Load configuration from `config_path`, falling back to defaults if absent.
pub fn load_config_from(config_path: &Path) -> Result<DaemonConfig> {
    let mut config = if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {:?}", config_path))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", config_path))?
    } else {
        DaemonConfig::default()
    };

    config.config_path = config_path.to_path_buf();

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", config.data_dir))?;

    Ok(config)
}

/// Validate signing and provider settings from the environment.
pub fn load_auth_config() -> Result<AuthConfig> {
    AuthConfig::from_env().context("Google client ID, secret, and JWT secret must be provided")
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "raibid-labs", "warden")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("data");
        let config_path = temp_dir.path().join("daemon.toml");
        std::fs::write(
            &config_path,
            format!(
                "socket_path = \"{}\"\ndata_dir = \"{}\"\nlog_level = \"debug\"\n",
                temp_dir.path().join("w.sock").display(),
                data_dir.display()
            ),
        )
        .unwrap();

        let config = load_config_from(&config_path).unwrap();

        assert_eq!(config.log_level, "debug");
        assert!(config.enable_exchange);
        assert_eq!(config.config_path, config_path);
        assert!(data_dir.is_dir());
        assert_eq!(config.principals_path(), data_dir.join("principals.json"));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("daemon.toml");
        std::fs::write(&config_path, "socket_path = [").unwrap();

        assert!(load_config_from(&config_path).is_err());
    }
}
