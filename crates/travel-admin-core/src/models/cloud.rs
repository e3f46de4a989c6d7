//! Request and reply shapes for the `httpAPI` cloud function and the
//! backend's direct collection endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::api::ApiError;

use super::Collection;

/// Operation requested from the cloud function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Get,
    Add,
    Update,
    Delete,
    GetStats,
    TestConnection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudRequest {
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<Collection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl CloudRequest {
    fn new(action: Action, collection: Option<Collection>) -> Self {
        Self {
            action,
            collection,
            query: None,
            data: None,
            id: None,
        }
    }

    pub fn get(collection: Collection, query: Value) -> Self {
        Self {
            query: Some(query),
            ..Self::new(Action::Get, Some(collection))
        }
    }

    pub fn add(collection: Collection, item: Value) -> Self {
        Self {
            data: Some(item),
            ..Self::new(Action::Add, Some(collection))
        }
    }

    pub fn update(collection: Collection, id: &str, patch: Value) -> Self {
        Self {
            data: Some(patch),
            id: Some(id.to_string()),
            ..Self::new(Action::Update, Some(collection))
        }
    }

    pub fn delete(collection: Collection, id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Self::new(Action::Delete, Some(collection))
        }
    }

    pub fn stats() -> Self {
        Self::new(Action::GetStats, None)
    }

    pub fn test_connection() -> Self {
        Self::new(Action::TestConnection, None)
    }
}

/// Reply envelope shared by the cloud function, the direct endpoint and the
/// local store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CloudReply {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            ..Default::default()
        }
    }

    /// Success with no payload (update/delete acknowledgements).
    pub fn done() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Best available description of why the reply is not a success.
    pub fn failure_reason(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "reply reported failure".to_string())
    }

    /// The reply's payload, provided the call succeeded.
    pub fn into_data(self) -> Result<Value, ApiError> {
        if !self.success {
            return Err(ApiError::InvalidResponse(self.failure_reason()));
        }
        self.data
            .ok_or_else(|| ApiError::InvalidResponse("reply has no data".to_string()))
    }

    /// The reply's payload as a collection array.
    /// Any other payload shape is an invalid response.
    pub fn into_items(self) -> Result<Vec<Value>, ApiError> {
        match self.into_data()? {
            Value::Array(items) => Ok(items),
            other => Err(ApiError::InvalidResponse(format!(
                "expected an array of records, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Unwrap the platform's invoke-cloud-function envelope.
///
/// A non-zero `errcode` is an error. When the envelope carries a `resp_data`
/// string, that string is the function's JSON reply; if it does not parse the
/// envelope itself is returned.
pub fn unwrap_upstream(envelope: Value) -> Result<Value, ApiError> {
    if let Some(errcode) = envelope.get("errcode").and_then(Value::as_i64) {
        if errcode != 0 {
            let errmsg = envelope
                .get("errmsg")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Err(ApiError::Upstream { errcode, errmsg });
        }
    }

    if let Some(resp_data) = envelope.get("resp_data").and_then(Value::as_str) {
        match serde_json::from_str(resp_data) {
            Ok(parsed) => return Ok(parsed),
            Err(e) => warn!(error = %e, "Failed to parse resp_data, returning envelope"),
        }
    }

    Ok(envelope)
}
