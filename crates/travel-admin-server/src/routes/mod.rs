//! HTTP routes for the dashboard backend.
//!
//! - `GET /api/health`, `GET /api/test`: liveness checks
//! - `POST /api/get-access-token`: exchanges app credentials upstream
//! - `POST /api/cloud-function`: forwards a call to a cloud function
//! - `POST /api/direct-cloud`: collection access served from the server store

pub mod cloud;
pub mod health;
pub mod token;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/test", get(health::test))
        .route("/api/get-access-token", post(token::get_access_token))
        .route("/api/cloud-function", post(cloud::cloud_function))
        .route("/api/direct-cloud", post(cloud::direct_cloud))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// JSON body with a status code.
pub(crate) fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

/// Unpack a JSON body. A body sent without a JSON content type reads as
/// empty so the handler's own validation answers; malformed JSON is a 400.
pub(crate) fn json_body<T: Default>(
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, Response> {
    match body {
        Ok(Json(body)) => Ok(body),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(T::default()),
        Err(rejection) => Err(reply(
            StatusCode::BAD_REQUEST,
            json!({ "success": false, "error": rejection.body_text() }),
        )),
    }
}

/// Treats empty strings as missing, like the dashboard does.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
