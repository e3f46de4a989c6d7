use axum::Json;
use chrono::Utc;
use serde::Serialize;
use travel_admin_core::api::HealthStatus;

#[derive(Serialize)]
pub struct TestReply {
    pub message: &'static str,
    pub timestamp: String,
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        timestamp: Some(Utc::now().to_rfc3339()),
        message: Some("Proxy server is running".to_string()),
    })
}

pub async fn test() -> Json<TestReply> {
    Json(TestReply {
        message: "Proxy server test succeeded",
        timestamp: Utc::now().to_rfc3339(),
    })
}
