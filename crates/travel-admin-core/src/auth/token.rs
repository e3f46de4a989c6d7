use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Token file name in cache directory
const TOKEN_FILE: &str = "token.json";

/// Seconds shaved off the issued lifetime so a token is refreshed before the
/// platform starts rejecting it.
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 300;

/// A token as returned by the issuing endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    /// Lifetime in seconds from the moment of issue
    pub expires_in: i64,
}

/// The cached upstream credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Build the cached credential from a grant received at `issued_at`.
    pub fn from_grant(grant: TokenGrant, issued_at: DateTime<Utc>) -> Self {
        Self {
            token: grant.access_token,
            expires_at: issued_at + Duration::seconds(grant.expires_in - TOKEN_EXPIRY_MARGIN_SECS),
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Get seconds remaining until expiry (for display)
    pub fn seconds_until_expiry(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }
}

/// Something that can exchange app credentials for an access token.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue_token(&self, app_id: &str, app_secret: &str) -> Result<TokenGrant>;
}

/// App id and secret presented to the token endpoint.
#[derive(Clone, Default)]
pub struct AppCredentials {
    pub app_id: String,
    pub app_secret: Option<String>,
}

impl std::fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("app_secret", &self.app_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// On-disk copy of the last issued token.
pub struct TokenStore {
    cache_dir: PathBuf,
}

impl TokenStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn load(&self) -> Result<Option<AccessToken>> {
        let path = self.token_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read token file")?;
        let token = serde_json::from_str(&contents).context("Failed to parse token file")?;
        Ok(Some(token))
    }

    pub fn save(&self, token: &AccessToken) -> Result<()> {
        let path = self.token_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(token)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        let path = self.token_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    fn token_path(&self) -> PathBuf {
        self.cache_dir.join(TOKEN_FILE)
    }
}

/// Outcome of the most recent refresh, handed to callers that waited on it.
#[derive(Default)]
struct LastRefresh {
    generation: u64,
    outcome: Option<Result<String, String>>,
}

/// Owns the upstream access token and hands out valid copies of it.
///
/// At most one refresh runs at a time. Callers arriving while a refresh is in
/// flight wait for it and get its result, token or error, without starting
/// another one.
pub struct TokenManager {
    issuer: Arc<dyn TokenIssuer>,
    credentials: AppCredentials,
    store: TokenStore,
    current: RwLock<Option<AccessToken>>,
    refresh_lock: Mutex<LastRefresh>,
    /// Completed refreshes; mirrors `LastRefresh::generation`
    generation: AtomicU64,
}

impl TokenManager {
    pub fn new(issuer: Arc<dyn TokenIssuer>, credentials: AppCredentials, store: TokenStore) -> Self {
        Self {
            issuer,
            credentials,
            store,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(LastRefresh::default()),
            generation: AtomicU64::new(0),
        }
    }

    /// Return a valid access token, refreshing it if needed.
    pub async fn get_token(&self) -> Result<String> {
        // Read before the cache so a refresh finishing in between is seen
        let seen = self.generation.load(Ordering::Acquire);

        if let Some(token) = self.valid_cached().await {
            debug!("Using cached access token");
            return Ok(token);
        }

        let mut last = match self.refresh_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Token refresh in progress, waiting");
                self.refresh_lock.lock().await
            }
        };

        // A refresh completed after we arrived: share its result
        if last.generation != seen {
            if let Some(outcome) = last.outcome.clone() {
                debug!("Using result of concurrent token refresh");
                return outcome.map_err(anyhow::Error::msg);
            }
        }

        let outcome = self.refresh().await;
        last.outcome = Some(match &outcome {
            Ok(token) => Ok(token.clone()),
            Err(e) => Err(format!("{:#}", e)),
        });
        last.generation += 1;
        self.generation.store(last.generation, Ordering::Release);
        outcome
    }

    /// The cached token, without refreshing. May be expired.
    pub async fn cached_token(&self) -> Option<AccessToken> {
        self.current.read().await.clone()
    }

    async fn valid_cached(&self) -> Option<String> {
        self.current
            .read()
            .await
            .as_ref()
            .filter(|t| t.is_valid())
            .map(|t| t.token.clone())
    }

    /// Must be called with `refresh_lock` held.
    async fn refresh(&self) -> Result<String> {
        info!(app_id = %self.credentials.app_id, "Refreshing access token");

        let issued = match self.credentials.app_secret.as_deref() {
            Some(secret) => self.issuer.issue_token(&self.credentials.app_id, secret).await,
            None => Err(anyhow::anyhow!("No app secret configured")),
        };

        match issued {
            Ok(grant) => {
                let token = AccessToken::from_grant(grant, Utc::now());
                debug!(expires_at = %token.expires_at, "Access token refreshed");
                *self.current.write().await = Some(token.clone());
                if let Err(e) = self.store.save(&token) {
                    warn!(error = %e, "Failed to persist access token");
                }
                Ok(token.token)
            }
            Err(e) => {
                warn!(error = %e, "Access token refresh failed");
                match self.store.load() {
                    Ok(Some(saved)) if saved.is_valid() => {
                        info!("Using persisted access token");
                        let token = saved.token.clone();
                        *self.current.write().await = Some(saved);
                        Ok(token)
                    }
                    Ok(_) => Err(e.context("Failed to refresh access token")),
                    Err(load_err) => {
                        debug!(error = %load_err, "Persisted access token unreadable");
                        Err(e.context("Failed to refresh access token"))
                    }
                }
            }
        }
    }

    /// Adopt a persisted token if it is still valid; delete it if expired.
    /// Returns whether a token was adopted.
    pub async fn load_from_storage(&self) -> Result<bool> {
        match self.store.load()? {
            Some(saved) if saved.is_valid() => {
                debug!(expires_at = %saved.expires_at, "Loaded access token from storage");
                *self.current.write().await = Some(saved);
                Ok(true)
            }
            Some(_) => {
                debug!("Persisted access token expired, removing");
                self.store.clear()?;
                Ok(false)
            }
            None => Ok(false),
        }
    }

    /// Persist the current token, if any.
    pub async fn save_to_storage(&self) -> Result<()> {
        if let Some(ref token) = *self.current.read().await {
            self.store.save(token)?;
        }
        Ok(())
    }

    /// Forget the token in memory and on disk.
    pub async fn clear(&self) -> Result<()> {
        *self.current.write().await = None;
        self.store.clear()
    }
}
