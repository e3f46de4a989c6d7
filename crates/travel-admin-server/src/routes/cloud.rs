use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use travel_admin_core::models::{unwrap_upstream, Action, CloudRequest, Collection};
use travel_admin_core::ApiError;

use super::{json_body, present, reply};
use crate::state::AppState;

const INVOKE_PATH: &str = "/tcb/invokecloudfunction";

// ============================================================================
// Cloud-function proxy
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudFunctionBody {
    pub access_token: Option<String>,
    pub env_id: Option<String>,
    pub function_name: Option<String>,
    pub data: Option<Value>,
}

pub async fn cloud_function(
    State(state): State<AppState>,
    body: Result<Json<CloudFunctionBody>, JsonRejection>,
) -> Response {
    let body = match json_body(body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let (Some(token), Some(env_id), Some(function_name)) = (
        present(&body.access_token),
        present(&body.env_id),
        present(&body.function_name),
    ) else {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({
                "error": "missing required parameters",
                "required": ["accessToken", "envId", "functionName"],
                "received": {
                    "accessToken": present(&body.access_token).is_some(),
                    "envId": present(&body.env_id).is_some(),
                    "functionName": present(&body.function_name).is_some(),
                }
            }),
        );
    };

    info!(env_id, function = function_name, "Invoking cloud function");
    let payload = body.data.clone().unwrap_or_else(|| json!({}));
    let envelope = match invoke(&state, token, env_id, function_name, &payload).await {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(function = function_name, error = %e, "Cloud function call failed");
            return reply(StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }));
        }
    };

    match unwrap_upstream(envelope) {
        Ok(result) => reply(StatusCode::OK, result),
        Err(ApiError::Upstream { errcode, errmsg }) => {
            warn!(function = function_name, errcode, errmsg = %errmsg, "Platform rejected cloud function call");
            reply(
                StatusCode::BAD_REQUEST,
                json!({ "error": "upstream error", "errcode": errcode, "errmsg": errmsg }),
            )
        }
        Err(e) => reply(StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() })),
    }
}

async fn invoke(
    state: &AppState,
    token: &str,
    env_id: &str,
    function_name: &str,
    payload: &Value,
) -> Result<Value, reqwest::Error> {
    state
        .client
        .post(state.upstream(INVOKE_PATH))
        .query(&[("access_token", token), ("env", env_id), ("name", function_name)])
        .json(payload)
        .send()
        .await?
        .json()
        .await
}

// ============================================================================
// Direct collection access
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectCloudBody {
    pub env_id: Option<String>,
    pub action: Option<String>,
    pub collection: Option<String>,
    pub data: Option<Value>,
    pub id: Option<String>,
    pub query: Option<Value>,
}

impl DirectCloudBody {
    /// Validate names into a typed request. Errors are client-facing messages.
    fn into_request(self) -> Result<CloudRequest, String> {
        let action_name = self.action.unwrap_or_default();
        let action: Action = serde_json::from_value(Value::String(action_name.clone()))
            .map_err(|_| format!("unknown action: {}", action_name))?;

        let collection = self
            .collection
            .filter(|c| !c.is_empty())
            .map(|c| c.parse::<Collection>())
            .transpose()
            .map_err(|e| e.to_string())?;

        Ok(CloudRequest {
            action,
            collection,
            query: self.query,
            data: self.data,
            id: self.id,
        })
    }
}

pub async fn direct_cloud(
    State(state): State<AppState>,
    body: Result<Json<DirectCloudBody>, JsonRejection>,
) -> Response {
    let body = match json_body(body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    if present(&body.env_id).is_none() {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({ "success": false, "error": "envId is required" }),
        );
    }

    let request = match body.into_request() {
        Ok(request) => request,
        Err(message) => {
            debug!(message = %message, "Rejected direct cloud request");
            return reply(
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": message }),
            );
        }
    };

    let store = state.store.clone();
    let result = tokio::task::spawn_blocking(move || store.apply(&request)).await;
    match result {
        Ok(cloud_reply) => {
            let status = if cloud_reply.success {
                StatusCode::OK
            } else {
                StatusCode::BAD_REQUEST
            };
            (status, Json(cloud_reply)).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Store task failed");
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "success": false, "error": e.to_string() }),
            )
        }
    }
}
