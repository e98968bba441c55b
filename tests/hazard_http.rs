//! Hazard Client HTTP Tests
//!
//! Runs the client against an in-process axum server standing in for the
//! hazard classifier:
//! - `x`/`y` reach the endpoint as query parameters
//! - the boolean field decides the answer
//! - non-2xx, malformed bodies, missing fields and slow answers are errors

use std::collections::HashMap;
use std::time::Duration;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use geoalert::hazard::{CheckError, HazardCheck, HazardClientConfig, HttpHazardClient};
use serde_json::{json, Value};
use tokio::net::TcpListener;

// =============================================================================
// Helper Functions
// =============================================================================

/// Serve `app` on an ephemeral port, return its base URL
async fn spawn_server(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Dangerous when x > y
async fn classify(Query(params): Query<HashMap<String, f64>>) -> Json<Value> {
    let x = params.get("x").copied().unwrap_or_default();
    let y = params.get("y").copied().unwrap_or_default();
    Json(json!({ "dangerous": x > y }))
}

fn client(base_url: &str) -> HttpHazardClient {
    HttpHazardClient::new(&HazardClientConfig::with_base_url(base_url)).unwrap()
}

// =============================================================================
// Answer Tests
// =============================================================================

#[tokio::test]
async fn test_flag_decides_answer() {
    let base = spawn_server(Router::new().route("/is_dangerous", get(classify))).await;
    let client = client(&base);

    assert!(client.check(5.0, 1.0).await.unwrap());
    assert!(!client.check(1.0, 5.0).await.unwrap());
    assert!(!client.check(-2.5, -2.5).await.unwrap());
}

#[tokio::test]
async fn test_custom_path_and_field() {
    let app = Router::new().route(
        "/v2/zone",
        get(|| async { Json(json!({ "hazard": true })) }),
    );
    let base = spawn_server(app).await;

    let config = HazardClientConfig {
        path: "/v2/zone".into(),
        field: "hazard".into(),
        ..HazardClientConfig::with_base_url(base)
    };
    let client = HttpHazardClient::new(&config).unwrap();

    assert!(client.check(0.0, 0.0).await.unwrap());
}

// =============================================================================
// Failure Tests
// =============================================================================

#[tokio::test]
async fn test_server_error_is_status_error() {
    let app = Router::new().route(
        "/is_dangerous",
        get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let base = spawn_server(app).await;

    let err = client(&base).check(1.0, 1.0).await.unwrap_err();
    assert!(matches!(err, CheckError::Status(500)));
}

#[tokio::test]
async fn test_missing_field_is_not_safe() {
    let app = Router::new().route(
        "/is_dangerous",
        get(|| async { Json(json!({ "status": "ok" })) }),
    );
    let base = spawn_server(app).await;

    let err = client(&base).check(1.0, 1.0).await.unwrap_err();
    assert!(matches!(err, CheckError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_non_boolean_field_rejected() {
    let app = Router::new().route(
        "/is_dangerous",
        get(|| async { Json(json!({ "dangerous": "yes" })) }),
    );
    let base = spawn_server(app).await;

    let err = client(&base).check(1.0, 1.0).await.unwrap_err();
    assert!(matches!(err, CheckError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_non_json_body_rejected() {
    let app = Router::new().route("/is_dangerous", get(|| async { "definitely" }));
    let base = spawn_server(app).await;

    let err = client(&base).check(1.0, 1.0).await.unwrap_err();
    assert!(matches!(err, CheckError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let app = Router::new().route(
        "/is_dangerous",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({ "dangerous": false }))
        }),
    );
    let base = spawn_server(app).await;

    let config = HazardClientConfig {
        timeout_ms: 200,
        ..HazardClientConfig::with_base_url(base)
    };
    let client = HttpHazardClient::new(&config).unwrap();

    let err = client.check(1.0, 1.0).await.unwrap_err();
    assert!(matches!(err, CheckError::Timeout(200)));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    // Bind then drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{}", addr))
        .check(1.0, 1.0)
        .await
        .unwrap_err();
    assert!(matches!(err, CheckError::Transport(_)));
}
