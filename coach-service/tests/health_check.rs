//! Health, readiness, metrics and request-id behaviour.

mod common;

use coach_service::services::Strategy;
use common::spawn_app;
use service_core::middleware::REQUEST_ID_HEADER;

#[tokio::test]
async fn health_check_returns_ok() {
    let app = spawn_app(Strategy::Keyword).await;

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "coach-service");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn readiness_check_returns_ok() {
    let app = spawn_app(Strategy::Keyword).await;

    let response = app
        .client
        .get(format!("{}/ready", app.address))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn metrics_expose_turn_counters() {
    let app = spawn_app(Strategy::Keyword).await;
    let session_id = app.create_session().await;
    app.turn(&session_id, "my goal is clarity").await;

    let response = app
        .client
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let text = response.text().await.expect("Failed to read body");
    assert!(text.contains("coach_turns_total"));
}

#[tokio::test]
async fn request_id_is_echoed() {
    let app = spawn_app(Strategy::Keyword).await;

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .header(REQUEST_ID_HEADER, "trace-me-42")
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(
        response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok()),
        Some("trace-me-42")
    );
}
