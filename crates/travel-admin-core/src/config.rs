//! Client configuration management.
//!
//! This module handles loading and saving the dashboard client
//! configuration: backend URL, cloud environment id, app id and request
//! timeout. Environment variables override file values, and the app secret
//! is looked up in the OS keychain when neither provides it.
//!
//! Configuration is stored at `~/.config/travel-admin/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::client::REQUEST_TIMEOUT_SECS;
use crate::auth::{AppCredentials, CredentialStore};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "travel-admin";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3000";

pub const DEFAULT_ENV_ID: &str = "new-travel-2gy6d6oy7ee5fb0e";

pub const ENV_BACKEND_URL: &str = "TRAVEL_ADMIN_BACKEND_URL";
pub const ENV_ENV_ID: &str = "TRAVEL_ADMIN_ENV_ID";
pub const ENV_APP_ID: &str = "TRAVEL_ADMIN_APP_ID";
pub const ENV_APP_SECRET: &str = "TRAVEL_ADMIN_APP_SECRET";
pub const ENV_CACHE_DIR: &str = "TRAVEL_ADMIN_CACHE_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub backend_url: Option<String>,
    pub env_id: Option<String>,
    pub app_id: Option<String>,
    /// Read from the file if present but never written back
    #[serde(default, skip_serializing)]
    pub app_secret: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub cache_dir: Option<PathBuf>,
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Overwrite fields with values found by `lookup` (normally the process environment).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_BACKEND_URL) {
            self.backend_url = Some(url);
        }
        if let Some(env_id) = non_empty(ENV_ENV_ID) {
            self.env_id = Some(env_id);
        }
        if let Some(app_id) = non_empty(ENV_APP_ID) {
            self.app_id = Some(app_id);
        }
        if let Some(secret) = non_empty(ENV_APP_SECRET) {
            self.app_secret = Some(secret);
        }
        if let Some(dir) = non_empty(ENV_CACHE_DIR) {
            self.cache_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn backend_url(&self) -> &str {
        self.backend_url.as_deref().unwrap_or(DEFAULT_BACKEND_URL)
    }

    pub fn env_id(&self) -> &str {
        self.env_id.as_deref().unwrap_or(DEFAULT_ENV_ID)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(REQUEST_TIMEOUT_SECS))
    }

    /// Directory for the token file and the local store, one per environment.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir =
            dirs::cache_dir().ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME).join(self.env_id()))
    }

    /// App id and secret for the token endpoint. The secret comes from the
    /// config or environment, falling back to the OS keychain.
    pub fn app_credentials(&self) -> AppCredentials {
        let app_id = self.app_id.clone().unwrap_or_default();
        let app_secret = self.app_secret.clone().or_else(|| {
            if app_id.is_empty() {
                return None;
            }
            match CredentialStore::get_secret(&app_id) {
                Ok(secret) => Some(secret),
                Err(e) => {
                    debug!(error = %e, "No app secret in keychain");
                    None
                }
            }
        });
        AppCredentials { app_id, app_secret }
    }
}
