//! Server settings, read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use travel_admin_core::api::client::REQUEST_TIMEOUT_SECS;

pub const DEFAULT_PORT: u16 = 3000;

pub const DEFAULT_UPSTREAM_URL: &str = "https://api.weixin.qq.com";

pub const DEFAULT_DATA_DIR: &str = "data";

pub const ENV_PORT: &str = "PORT";
pub const ENV_UPSTREAM_URL: &str = "TRAVEL_ADMIN_UPSTREAM_URL";
pub const ENV_DATA_DIR: &str = "TRAVEL_ADMIN_DATA_DIR";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Base URL of the mini-program platform API
    pub upstream_url: String,
    /// Directory of the store backing `/api/direct-cloud`
    pub data_dir: PathBuf,
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from values found by `lookup`; blank values keep the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(port) = non_empty(ENV_PORT) {
            config.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: {}", ENV_PORT, port))?;
        }
        if let Some(url) = non_empty(ENV_UPSTREAM_URL) {
            config.upstream_url = url.trim_end_matches('/').to_string();
        }
        if let Some(dir) = non_empty(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}
