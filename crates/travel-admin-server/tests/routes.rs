//! Router tests. The platform API is a wiremock server.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tower::ServiceExt;
use travel_admin_core::auth::{AppCredentials, TokenManager, TokenStore};
use travel_admin_core::{ApiClient, Collection, DataGateway, LocalStore, Tier};
use travel_admin_server::{build_router, AppState, ServerConfig};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn router(upstream: &str, dir: &TempDir) -> Router {
    let config = ServerConfig {
        upstream_url: upstream.to_string(),
        data_dir: dir.path().join("data"),
        ..Default::default()
    };
    build_router(AppState::new(&config).unwrap())
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn call(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    send(app, request).await
}

async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    call(app, "POST", uri, Some(body)).await
}

/// POST an arbitrary body with an optional content type.
async fn post_raw(app: Router, uri: &str, content_type: Option<&str>, body: &str) -> (StatusCode, Value) {
    let mut request = Request::builder().method("POST").uri(uri);
    if let Some(content_type) = content_type {
        request = request.header("content-type", content_type);
    }
    let request = request.body(Body::from(body.to_string())).unwrap();

    send(app, request).await
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn health_and_test_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let app = router("http://127.0.0.1:1", &dir);

    let (status, body) = call(app.clone(), "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());

    let (status, body) = call(app, "GET", "/api/test", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());
}

// ============================================================================
// Token issuance
// ============================================================================

#[tokio::test]
async fn token_request_requires_appid_and_secret() {
    let dir = tempfile::tempdir().unwrap();
    let app = router("http://127.0.0.1:1", &dir);

    let (status, body) = post(app.clone(), "/api/get-access-token", json!({"appid": "wx1"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = post(app, "/api/get-access-token", json!({"appid": "", "secret": "s"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn token_request_is_forwarded_upstream() {
    let upstream = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .and(query_param("grant_type", "client_credential"))
        .and(query_param("appid", "wx1"))
        .and(query_param("secret", "s3cret"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok", "expires_in": 7200})),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let (status, body) = post(
        router(&upstream.uri(), &dir),
        "/api/get-access-token",
        json!({"appid": "wx1", "secret": "s3cret"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "access_token": "tok", "expires_in": 7200}));
}

#[tokio::test]
async fn token_refusal_is_reported() {
    let upstream = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"errcode": 40013, "errmsg": "invalid appid"})),
        )
        .mount(&upstream)
        .await;

    let (status, body) = post(
        router(&upstream.uri(), &dir),
        "/api/get-access-token",
        json!({"appid": "wx1", "secret": "s3cret"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": false, "error": "invalid appid"}));
}

#[tokio::test]
async fn unreachable_upstream_is_a_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = post(
        router("http://127.0.0.1:1", &dir),
        "/api/get-access-token",
        json!({"appid": "wx1", "secret": "s3cret"}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
}

// ============================================================================
// Cloud-function proxy
// ============================================================================

#[tokio::test]
async fn cloud_function_reports_missing_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = post(
        router("http://127.0.0.1:1", &dir),
        "/api/cloud-function",
        json!({"accessToken": "tok", "functionName": "httpAPI"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["required"], json!(["accessToken", "envId", "functionName"]));
    assert_eq!(
        body["received"],
        json!({"accessToken": true, "envId": false, "functionName": true})
    );
}

#[tokio::test]
async fn cloud_function_unwraps_resp_data() {
    let upstream = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/tcb/invokecloudfunction"))
        .and(query_param("access_token", "tok"))
        .and(query_param("env", "env-1"))
        .and(query_param("name", "httpAPI"))
        .and(body_json(json!({"action": "get", "collection": "products"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errcode": 0,
            "errmsg": "ok",
            "resp_data": "{\"success\":true,\"data\":[{\"_id\":\"p1\"}]}"
        })))
        .mount(&upstream)
        .await;

    let (status, body) = post(
        router(&upstream.uri(), &dir),
        "/api/cloud-function",
        json!({
            "accessToken": "tok",
            "envId": "env-1",
            "functionName": "httpAPI",
            "data": {"action": "get", "collection": "products"}
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "data": [{"_id": "p1"}]}));
}

#[tokio::test]
async fn cloud_function_returns_raw_envelope_when_resp_data_is_not_json() {
    let upstream = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let envelope = json!({"errcode": 0, "errmsg": "ok", "resp_data": "plain text"});
    Mock::given(method("POST"))
        .and(path("/tcb/invokecloudfunction"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope.clone()))
        .mount(&upstream)
        .await;

    let (status, body) = post(
        router(&upstream.uri(), &dir),
        "/api/cloud-function",
        json!({"accessToken": "tok", "envId": "env-1", "functionName": "httpAPI"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, envelope);
}

#[tokio::test]
async fn cloud_function_maps_platform_errors() {
    let upstream = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/tcb/invokecloudfunction"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"errcode": 42001, "errmsg": "access_token expired"})),
        )
        .mount(&upstream)
        .await;

    let (status, body) = post(
        router(&upstream.uri(), &dir),
        "/api/cloud-function",
        json!({"accessToken": "old", "envId": "env-1", "functionName": "httpAPI", "data": {}}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errcode"], 42001);
    assert_eq!(body["errmsg"], "access_token expired");
}

// ============================================================================
// Direct collection access
// ============================================================================

#[tokio::test]
async fn direct_cloud_requires_env_id() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = post(
        router("http://127.0.0.1:1", &dir),
        "/api/direct-cloud",
        json!({"action": "testConnection"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn direct_cloud_serves_seeded_store() {
    let dir = tempfile::tempdir().unwrap();
    let app = router("http://127.0.0.1:1", &dir);

    let (status, body) = post(
        app.clone(),
        "/api/direct-cloud",
        json!({"envId": "env-1", "action": "testConnection"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["products"], 2);
    assert_eq!(body["data"]["orders"], 1);

    let (status, body) = post(
        app,
        "/api/direct-cloud",
        json!({"envId": "env-1", "action": "get", "collection": "regions", "query": {}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn direct_cloud_mutations_persist() {
    let dir = tempfile::tempdir().unwrap();
    let app = router("http://127.0.0.1:1", &dir);

    let (status, body) = post(
        app.clone(),
        "/api/direct-cloud",
        json!({"envId": "env-1", "action": "add", "collection": "banners", "data": {"title": "秋季特惠"}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["data"]["_id"].as_str().unwrap().to_string();

    let (status, _) = post(
        app.clone(),
        "/api/direct-cloud",
        json!({"envId": "env-1", "action": "update", "collection": "banners", "id": id, "data": {"sort": 1}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = post(
        app.clone(),
        "/api/direct-cloud",
        json!({"envId": "env-1", "action": "get", "collection": "banners", "query": {"where": {"_id": id}}}),
    )
    .await;
    let found = body["data"].as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["title"], "秋季特惠");
    assert_eq!(found[0]["sort"], 1);

    let (status, _) = post(
        app.clone(),
        "/api/direct-cloud",
        json!({"envId": "env-1", "action": "delete", "collection": "banners", "id": id}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = post(
        app,
        "/api/direct-cloud",
        json!({"envId": "env-1", "action": "getStats"}),
    )
    .await;
    assert_eq!(body["data"]["bannerCount"], 2);
}

#[tokio::test]
async fn direct_cloud_rejects_unknown_names() {
    let dir = tempfile::tempdir().unwrap();
    let app = router("http://127.0.0.1:1", &dir);

    let (status, body) = post(
        app.clone(),
        "/api/direct-cloud",
        json!({"envId": "env-1", "action": "get", "collection": "users"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "message": "unknown collection: users"}));

    let (status, body) = post(
        app.clone(),
        "/api/direct-cloud",
        json!({"envId": "env-1", "action": "truncate", "collection": "products"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    // A missing record is reported, not ignored
    let (status, body) = post(
        app,
        "/api/direct-cloud",
        json!({"envId": "env-1", "action": "update", "collection": "products", "id": "nope", "data": {}}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

// ============================================================================
// Request bodies
// ============================================================================

#[tokio::test]
async fn body_without_json_content_type_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let app = router("http://127.0.0.1:1", &dir);

    let (status, body) = post_raw(
        app.clone(),
        "/api/get-access-token",
        Some("application/x-www-form-urlencoded"),
        "appid=wx1&secret=s3cret",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "error": "appid and secret are required"}));

    let (status, body) = post_raw(app.clone(), "/api/direct-cloud", None, "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "error": "envId is required"}));

    let (status, body) = post_raw(app, "/api/cloud-function", None, "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["received"]["envId"], false);
}

#[tokio::test]
async fn malformed_json_is_a_json_400() {
    let dir = tempfile::tempdir().unwrap();
    let app = router("http://127.0.0.1:1", &dir);

    let (status, body) = post_raw(
        app.clone(),
        "/api/cloud-function",
        Some("application/json"),
        "not json",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());

    // Well-formed JSON of the wrong shape
    let (status, body) = post_raw(
        app,
        "/api/direct-cloud",
        Some("application/json"),
        r#"{"envId": 5}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

// ============================================================================
// Gateway against a running server
// ============================================================================

#[tokio::test]
async fn gateway_reads_directly_from_running_server() {
    let dir = tempfile::tempdir().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router("http://127.0.0.1:1", &dir);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let base = format!("http://{}", addr);
    let api = ApiClient::new(&base).unwrap();
    let tokens = Arc::new(TokenManager::new(
        Arc::new(api.clone()),
        AppCredentials {
            app_id: "wx1".to_string(),
            app_secret: None,
        },
        TokenStore::new(dir.path().join("client")),
    ));
    let store = LocalStore::new(dir.path().join("client-store")).unwrap();
    let gateway = DataGateway::new(api, tokens, store, "env-1");

    assert!(gateway.health().await.unwrap().is_ok());

    let outcome = gateway.products().await;
    assert_eq!(outcome.tier, Tier::Direct);
    assert_eq!(outcome.items.len(), 2);
    assert_eq!(gateway.store().load(Collection::Products).unwrap().len(), 2);

    let report = gateway.test_connection().await;
    assert!(report.is_online());
    assert!(gateway.is_connected());
}
