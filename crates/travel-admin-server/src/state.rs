use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{debug, warn};
use travel_admin_core::LocalStore;

use crate::config::ServerConfig;

/// Shared handler state.
/// Clone is cheap - the client and store are reference counted.
#[derive(Clone)]
pub struct AppState {
    pub client: Client,
    pub upstream_url: String,
    pub store: Arc<LocalStore>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let store = LocalStore::new(&config.data_dir).context("Failed to open server store")?;
        if let Err(e) = store.seed_if_empty() {
            warn!(error = %e, "Failed to seed server store");
        }
        debug!(dir = %store.dir().display(), "Server store ready");

        Ok(Self {
            client,
            upstream_url: config.upstream_url.trim_end_matches('/').to_string(),
            store: Arc::new(store),
        })
    }

    pub(crate) fn upstream(&self, path: &str) -> String {
        format!("{}{}", self.upstream_url, path)
    }
}
