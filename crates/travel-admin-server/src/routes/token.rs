use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::{json_body, present, reply};
use crate::state::AppState;

const TOKEN_PATH: &str = "/cgi-bin/token";

#[derive(Debug, Default, Deserialize)]
pub struct TokenRequestBody {
    pub appid: Option<String>,
    pub secret: Option<String>,
}

/// Platform answer to a credential exchange.
#[derive(Debug, Deserialize)]
struct UpstreamToken {
    access_token: Option<String>,
    expires_in: Option<i64>,
    errmsg: Option<String>,
}

pub async fn get_access_token(
    State(state): State<AppState>,
    body: Result<Json<TokenRequestBody>, JsonRejection>,
) -> Response {
    let body = match json_body(body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let (Some(appid), Some(secret)) = (present(&body.appid), present(&body.secret)) else {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({ "success": false, "error": "appid and secret are required" }),
        );
    };

    info!(appid, "Requesting access token");
    match request_token(&state, appid, secret).await {
        Ok(UpstreamToken {
            access_token: Some(token),
            expires_in,
            ..
        }) => reply(
            StatusCode::OK,
            json!({ "success": true, "access_token": token, "expires_in": expires_in }),
        ),
        Ok(upstream) => {
            let error = upstream
                .errmsg
                .unwrap_or_else(|| "failed to obtain access_token".to_string());
            warn!(appid, error = %error, "Platform refused token request");
            reply(StatusCode::OK, json!({ "success": false, "error": error }))
        }
        Err(e) => {
            warn!(appid, error = %e, "Token request failed");
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "success": false, "error": e.to_string() }),
            )
        }
    }
}

async fn request_token(
    state: &AppState,
    appid: &str,
    secret: &str,
) -> Result<UpstreamToken, reqwest::Error> {
    state
        .client
        .get(state.upstream(TOKEN_PATH))
        .query(&[
            ("grant_type", "client_credential"),
            ("appid", appid),
            ("secret", secret),
        ])
        .send()
        .await?
        .json()
        .await
}
