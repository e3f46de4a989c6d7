//! API client for the admin backend.
//!
//! This module provides the `ApiClient` struct for the four backend
//! endpoints the dashboard uses: health, token issuance, the direct
//! collection query and the cloud-function proxy.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::auth::{TokenGrant, TokenIssuer};
use crate::models::{unwrap_upstream, CloudReply, CloudRequest};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Name of the cloud function that fronts the collections.
pub const CLOUD_FUNCTION_NAME: &str = "httpAPI";

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 7200;

const HEALTH_PATH: &str = "/api/health";
const TOKEN_PATH: &str = "/api/get-access-token";
const DIRECT_CLOUD_PATH: &str = "/api/direct-cloud";
const CLOUD_FUNCTION_PATH: &str = "/api/cloud-function";

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    appid: &'a str,
    secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    success: bool,
    access_token: Option<String>,
    expires_in: Option<i64>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct DirectCloudBody<'a> {
    #[serde(rename = "envId")]
    env_id: &'a str,
    #[serde(flatten)]
    request: &'a CloudRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CloudFunctionBody<'a> {
    access_token: &'a str,
    env_id: &'a str,
    function_name: &'a str,
    data: &'a CloudRequest,
}

/// Answer from the backend's health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// API client for the admin backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client for the backend at `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to send GET request to {}", url))?;

        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.url(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to send POST request to {}", url))?;

        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    // ===== Endpoints =====

    pub async fn health(&self) -> Result<HealthStatus> {
        self.get(HEALTH_PATH).await
    }

    /// Exchange app credentials for an access token.
    pub async fn request_token(&self, app_id: &str, app_secret: &str) -> Result<TokenGrant> {
        let body = TokenRequest {
            appid: app_id,
            secret: app_secret,
        };
        let response: TokenResponse = self.post(TOKEN_PATH, &body).await?;

        match response.access_token {
            Some(access_token) if response.success => Ok(TokenGrant {
                access_token,
                expires_in: response.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS),
            }),
            _ => Err(ApiError::InvalidResponse(
                response
                    .error
                    .unwrap_or_else(|| "token endpoint returned no token".to_string()),
            )
            .into()),
        }
    }

    /// Query the backend's own database endpoint, no token needed.
    pub async fn direct_cloud(&self, env_id: &str, request: &CloudRequest) -> Result<CloudReply> {
        debug!(action = ?request.action, collection = ?request.collection, "Direct cloud request");
        let body = DirectCloudBody { env_id, request };
        self.post(DIRECT_CLOUD_PATH, &body).await
    }

    /// Invoke a cloud function through the backend proxy.
    pub async fn call_cloud_function(
        &self,
        access_token: &str,
        env_id: &str,
        function_name: &str,
        request: &CloudRequest,
    ) -> Result<CloudReply> {
        debug!(
            function = function_name,
            action = ?request.action,
            collection = ?request.collection,
            "Proxied cloud function call"
        );
        let body = CloudFunctionBody {
            access_token,
            env_id,
            function_name,
            data: request,
        };
        let envelope: Value = self.post(CLOUD_FUNCTION_PATH, &body).await?;
        let reply = unwrap_upstream(envelope)?;
        serde_json::from_value(reply).context("Failed to parse cloud function reply")
    }
}

#[async_trait]
impl TokenIssuer for ApiClient {
    async fn issue_token(&self, app_id: &str, app_secret: &str) -> Result<TokenGrant> {
        self.request_token(app_id, app_secret).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Collection;
    use serde_json::json;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.url(HEALTH_PATH), "http://localhost:3000/api/health");
    }

    #[test]
    fn test_direct_cloud_body_flattens_request() {
        let request = CloudRequest::get(Collection::Regions, json!({}));
        let body = DirectCloudBody {
            env_id: "env-1",
            request: &request,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"envId": "env-1", "action": "get", "collection": "regions", "query": {}})
        );
    }

    #[test]
    fn test_cloud_function_body_shape() {
        let request = CloudRequest::stats();
        let body = CloudFunctionBody {
            access_token: "tok",
            env_id: "env-1",
            function_name: CLOUD_FUNCTION_NAME,
            data: &request,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "accessToken": "tok",
                "envId": "env-1",
                "functionName": "httpAPI",
                "data": {"action": "getStats"}
            })
        );
    }
}
