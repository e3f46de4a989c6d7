//! Fallback-chaining data access for the dashboard.
//!
//! Every read walks a fixed chain and stops at the first tier that answers:
//!
//! 1. the backend's direct collection endpoint (no token);
//! 2. the `httpAPI` cloud function through the backend proxy, using a token
//!    from the [`TokenManager`];
//! 3. the local store, or the canned dataset when the store has nothing.
//!
//! Failures are logged and collected in the outcome, never returned.
//! Local store file I/O runs on the blocking pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::api::{ApiClient, HealthStatus, CLOUD_FUNCTION_NAME};
use crate::auth::{TokenManager, TokenStore};
use crate::config::Config;
use crate::models::{record_id, CloudReply, CloudRequest, Collection, Stats, ID_FIELD};
use crate::store::{mock, LocalStore};

/// Subdirectory of the cache directory holding the local store
const STORE_DIR: &str = "store";

/// Where a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Direct,
    Proxied,
    LocalStore,
    Mock,
}

impl Tier {
    pub fn is_remote(&self) -> bool {
        matches!(self, Tier::Direct | Tier::Proxied)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::Direct => "direct",
            Tier::Proxied => "proxied",
            Tier::LocalStore => "local store",
            Tier::Mock => "mock data",
        }
    }
}

/// A tier that was tried and failed.
#[derive(Debug, Clone, Serialize)]
pub struct TierFailure {
    pub tier: Tier,
    pub error: String,
}

/// Result of a collection read.
#[derive(Debug, Clone, Serialize)]
pub struct FetchOutcome {
    pub collection: Collection,
    pub tier: Tier,
    pub items: Vec<Value>,
    pub failures: Vec<TierFailure>,
}

impl FetchOutcome {
    /// True when the items are offline or canned data.
    pub fn is_degraded(&self) -> bool {
        !self.tier.is_remote()
    }

    /// Short user-facing notice for degraded results.
    pub fn notice(&self) -> Option<String> {
        if !self.is_degraded() {
            return None;
        }
        Some(format!(
            "Could not reach the cloud for {}; showing {}",
            self.collection,
            self.tier.label()
        ))
    }
}

/// Result of a connection test.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionReport {
    pub tier: Tier,
    pub data: Value,
    pub failures: Vec<TierFailure>,
}

impl ConnectionReport {
    pub fn is_online(&self) -> bool {
        self.tier.is_remote()
    }
}

pub struct DataGateway {
    api: ApiClient,
    tokens: Arc<TokenManager>,
    store: Arc<LocalStore>,
    env_id: String,
    connected: AtomicBool,
}

impl DataGateway {
    pub fn new(api: ApiClient, tokens: Arc<TokenManager>, store: LocalStore, env_id: &str) -> Self {
        Self {
            api,
            tokens,
            store: Arc::new(store),
            env_id: env_id.to_string(),
            connected: AtomicBool::new(false),
        }
    }

    /// Build the gateway and its collaborators from configuration.
    /// Adopts a persisted token and seeds the local store on first run.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let cache_dir = config.cache_dir()?;
        debug!(?cache_dir, "Cache directory configured");

        let api = ApiClient::with_timeout(config.backend_url(), config.request_timeout())?;
        let tokens = Arc::new(TokenManager::new(
            Arc::new(api.clone()),
            config.app_credentials(),
            TokenStore::new(cache_dir.clone()),
        ));
        match tokens.load_from_storage().await {
            Ok(loaded) => debug!(loaded, "Checked persisted access token"),
            Err(e) => warn!(error = %e, "Failed to load persisted access token"),
        }

        let store = LocalStore::new(cache_dir.join(STORE_DIR)).context("Failed to open local store")?;
        let gateway = Self::new(api, tokens, store, config.env_id());
        if let Err(e) = gateway.with_store(|store| store.seed_if_empty()).await {
            warn!(error = %format!("{:#}", e), "Failed to seed local store");
        }
        Ok(gateway)
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Run a local store operation on the blocking pool.
    async fn with_store<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&LocalStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .context("Local store task failed")?
    }

    /// Answer a request from the local store.
    async fn apply_locally(&self, request: CloudRequest) -> CloudReply {
        self.with_store(move |store| Ok(store.apply(&request)))
            .await
            .unwrap_or_else(|e| CloudReply::failed(format!("{:#}", e)))
    }

    /// Whether the last connection test reached a remote tier.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        self.api.health().await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Read a collection through the fallback chain. Always returns records
    /// for a known collection.
    pub async fn fetch(&self, collection: Collection, query: Value) -> FetchOutcome {
        // Only a full read may replace the stored copy
        let full_read = query.as_object().map_or(true, |q| q.is_empty());
        let request = CloudRequest::get(collection, query);
        let mut failures = Vec::new();

        match self.fetch_direct(&request).await {
            Ok(items) => {
                return self
                    .remote_outcome(collection, Tier::Direct, items, failures, full_read)
                    .await
            }
            Err(e) => {
                warn!(collection = %collection, error = %format!("{:#}", e), "Direct fetch failed, trying proxy");
                failures.push(TierFailure {
                    tier: Tier::Direct,
                    error: format!("{:#}", e),
                });
            }
        }

        match self.fetch_proxied(&request).await {
            Ok(items) => {
                return self
                    .remote_outcome(collection, Tier::Proxied, items, failures, full_read)
                    .await
            }
            Err(e) => {
                warn!(collection = %collection, error = %format!("{:#}", e), "Proxied fetch failed, using local data");
                failures.push(TierFailure {
                    tier: Tier::Proxied,
                    error: format!("{:#}", e),
                });
            }
        }

        self.fallback_outcome(collection, failures).await
    }

    async fn fetch_direct(&self, request: &CloudRequest) -> Result<Vec<Value>> {
        let reply = self.api.direct_cloud(&self.env_id, request).await?;
        Ok(reply.into_items()?)
    }

    async fn fetch_proxied(&self, request: &CloudRequest) -> Result<Vec<Value>> {
        let reply = self.call_proxied(request).await?;
        Ok(reply.into_items()?)
    }

    async fn call_proxied(&self, request: &CloudRequest) -> Result<CloudReply> {
        let token = self
            .tokens
            .get_token()
            .await
            .context("No access token for proxied call")?;
        self.api
            .call_cloud_function(&token, &self.env_id, CLOUD_FUNCTION_NAME, request)
            .await
    }

    async fn remote_outcome(
        &self,
        collection: Collection,
        tier: Tier,
        items: Vec<Value>,
        failures: Vec<TierFailure>,
        store: bool,
    ) -> FetchOutcome {
        debug!(collection = %collection, tier = tier.label(), count = items.len(), "Fetched collection");
        if store {
            let copy = items.clone();
            if let Err(e) = self
                .with_store(move |store| store.save(collection, &copy))
                .await
            {
                warn!(collection = %collection, error = %format!("{:#}", e), "Failed to update local store");
            }
        }
        FetchOutcome {
            collection,
            tier,
            items,
            failures,
        }
    }

    async fn fallback_outcome(
        &self,
        collection: Collection,
        mut failures: Vec<TierFailure>,
    ) -> FetchOutcome {
        match self.with_store(move |store| store.load(collection)).await {
            Ok(items) if !items.is_empty() => {
                info!(collection = %collection, count = items.len(), "Serving collection from local store");
                return FetchOutcome {
                    collection,
                    tier: Tier::LocalStore,
                    items,
                    failures,
                };
            }
            Ok(_) => debug!(collection = %collection, "Local store empty"),
            Err(e) => {
                warn!(collection = %collection, error = %format!("{:#}", e), "Failed to read local store");
                failures.push(TierFailure {
                    tier: Tier::LocalStore,
                    error: format!("{:#}", e),
                });
            }
        }

        info!(collection = %collection, "Serving canned fallback data");
        FetchOutcome {
            collection,
            tier: Tier::Mock,
            items: mock::dataset(collection),
            failures,
        }
    }

    pub async fn products(&self) -> FetchOutcome {
        self.fetch(Collection::Products, json!({})).await
    }

    pub async fn regions(&self) -> FetchOutcome {
        self.fetch(Collection::Regions, json!({})).await
    }

    pub async fn banners(&self) -> FetchOutcome {
        self.fetch(Collection::Banners, json!({})).await
    }

    pub async fn orders(&self) -> FetchOutcome {
        self.fetch(Collection::Orders, json!({})).await
    }

    /// Look up one record by id.
    pub async fn get_by_id(&self, collection: Collection, id: &str) -> Option<Value> {
        let outcome = self
            .fetch(collection, json!({ "where": { ID_FIELD: id } }))
            .await;
        outcome.items.into_iter().find(|r| record_id(r) == Some(id))
    }

    /// Record counts for all collections, fetched concurrently.
    pub async fn stats(&self) -> Stats {
        let outcomes =
            futures::future::join_all(Collection::ALL.into_iter().map(|c| self.fetch(c, json!({}))))
                .await;

        let mut stats = Stats::default();
        for outcome in outcomes {
            stats.set(outcome.collection, outcome.items.len());
        }
        stats
    }

    // =========================================================================
    // Connection
    // =========================================================================

    pub async fn test_connection(&self) -> ConnectionReport {
        let request = CloudRequest::test_connection();
        let mut failures = Vec::new();

        let direct = self
            .api
            .direct_cloud(&self.env_id, &request)
            .await
            .and_then(|reply| Ok(reply.into_data()?));
        match direct {
            Ok(data) => return self.connected_report(Tier::Direct, data, failures),
            Err(e) => failures.push(TierFailure {
                tier: Tier::Direct,
                error: format!("{:#}", e),
            }),
        }

        let proxied = self
            .call_proxied(&request)
            .await
            .and_then(|reply| Ok(reply.into_data()?));
        match proxied {
            Ok(data) => return self.connected_report(Tier::Proxied, data, failures),
            Err(e) => failures.push(TierFailure {
                tier: Tier::Proxied,
                error: format!("{:#}", e),
            }),
        }

        warn!(failures = failures.len(), "Cloud unreachable, running from local store");
        self.connected.store(false, Ordering::Relaxed);
        let data = self.apply_locally(request).await.data.unwrap_or(Value::Null);
        ConnectionReport {
            tier: Tier::LocalStore,
            data,
            failures,
        }
    }

    fn connected_report(&self, tier: Tier, data: Value, failures: Vec<TierFailure>) -> ConnectionReport {
        info!(tier = tier.label(), "Cloud connection established");
        self.connected.store(true, Ordering::Relaxed);
        ConnectionReport {
            tier,
            data,
            failures,
        }
    }

    /// Drop the local copies and go back to the cloud. When the cloud is
    /// unreachable the local store is reseeded with canned data.
    /// Returns whether the cloud answered.
    pub async fn force_reload(&self) -> bool {
        info!("Reloading data from the cloud");
        if let Err(e) = self.with_store(|store| store.clear()).await {
            warn!(error = %format!("{:#}", e), "Failed to clear local store");
        }

        let report = self.test_connection().await;
        if !report.is_online() {
            if let Err(e) = self.with_store(|store| store.seed_if_empty()).await {
                warn!(error = %format!("{:#}", e), "Failed to reseed local store");
            }
        }
        report.is_online()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub async fn create(&self, collection: Collection, item: Value) -> CloudReply {
        if !collection.is_editable() {
            return CloudReply::failed(format!("{} cannot be created from the dashboard", collection));
        }
        self.mutate(CloudRequest::add(collection, item)).await
    }

    pub async fn update(&self, collection: Collection, id: &str, patch: Value) -> CloudReply {
        self.mutate(CloudRequest::update(collection, id, patch)).await
    }

    pub async fn delete(&self, collection: Collection, id: &str) -> CloudReply {
        if !collection.is_editable() {
            return CloudReply::failed(format!("{} cannot be deleted from the dashboard", collection));
        }
        self.mutate(CloudRequest::delete(collection, id)).await
    }

    pub async fn update_order_status(&self, id: &str, status: &str) -> CloudReply {
        self.update(Collection::Orders, id, json!({ "status": status }))
            .await
    }

    /// Send a mutation through the proxy; apply it to the local store if the
    /// proxy cannot be reached. A reply from the cloud is returned as is,
    /// including failures it reports.
    async fn mutate(&self, request: CloudRequest) -> CloudReply {
        match self.call_proxied(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    action = ?request.action,
                    collection = ?request.collection,
                    error = %format!("{:#}", e),
                    "Proxied mutation failed, applying to local store"
                );
                self.apply_locally(request).await
            }
        }
    }
}
