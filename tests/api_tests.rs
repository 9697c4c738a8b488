use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use railgate::{create_router, AppState, Config, GateState, StateStore, TrainStatus};

/// Create a test app over the seeded store.
fn create_test_app() -> (axum::Router, StateStore) {
    let store = StateStore::seeded();
    let state = AppState::new(store.clone(), &Config::default());
    (create_router(state), store)
}

/// Helper to get response body as string.
async fn body_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = body_string(response.into_body()).await;
    (status, serde_json::from_str(&body).unwrap_or(serde_json::Value::Null))
}

async fn post_login(app: axum::Router, body: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/login")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_string(response.into_body()).await)
}

// ============================================================================
// Health endpoint tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = create_test_app();
    let (status, json) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["clients"], 0);
}

// ============================================================================
// Snapshot and entity endpoint tests
// ============================================================================

#[tokio::test]
async fn test_get_snapshot() {
    let (app, _) = create_test_app();
    let (status, json) = get_json(app, "/api/snapshot").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["trains"].as_array().unwrap().len(), 5);
    assert_eq!(json["trains"][0]["id"], "EXP-12345");
    assert_eq!(json["trains"][0]["status"], "ontime");
    assert_eq!(json["trains"][0]["crossingDuration"], 8);
    assert_eq!(json["gate"]["status"], "CLOSED");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_snapshot_reflects_mutations() {
    let (app, store) = create_test_app();
    store
        .apply_train_status_change("LOC-67890", TrainStatus::Approaching)
        .unwrap();
    store.apply_gate_status_change(GateState::Open);

    let (_, json) = get_json(app, "/api/snapshot").await;
    assert_eq!(json["trains"][1]["status"], "approaching");
    assert_eq!(json["trains"][0]["status"], "ontime");
    assert_eq!(json["gate"]["status"], "OPEN");
}

#[tokio::test]
async fn test_get_trains_and_gate() {
    let (app, _) = create_test_app();
    let (status, trains) = get_json(app.clone(), "/api/trains").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trains.as_array().unwrap().len(), 5);

    let (status, gate) = get_json(app, "/api/gate-status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(gate["id"], "GATE-001");
    assert_eq!(gate["location"], "Main Street Railway Crossing");
}

// ============================================================================
// Stats endpoint tests
// ============================================================================

#[tokio::test]
async fn test_get_stats() {
    let (app, _) = create_test_app();
    let (status, json) = get_json(app, "/api/stats").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totalTrains"], 5);
    assert_eq!(json["onTimeTrains"], 3);
    assert_eq!(json["delayedTrains"], 1);
    assert_eq!(json["gateStatus"], "CLOSED");
    assert_eq!(json["averageWaitTime"], 13);
    assert_eq!(json["trainsToday"], 24);
}

// ============================================================================
// Closures, alerts and locations
// ============================================================================

#[tokio::test]
async fn test_get_closures_sorted() {
    let (app, _) = create_test_app();
    let (status, json) = get_json(app, "/api/closures").await;

    assert_eq!(status, StatusCode::OK);
    let closures = json["closures"].as_array().unwrap();
    assert_eq!(closures.len(), 5);
    assert_eq!(closures[0]["closureStart"], "14:25");
    assert_eq!(closures[4]["closureStart"], "16:15");
}

#[tokio::test]
async fn test_get_alerts() {
    let (app, _) = create_test_app();
    let (status, json) = get_json(app, "/api/alerts").await;

    assert_eq!(status, StatusCode::OK);
    let alerts = json["alerts"].as_array().unwrap();
    assert!(alerts
        .iter()
        .any(|a| a["type"] == "delay_alert" && a["trainNumber"] == "LOC-67890"));
}

#[tokio::test]
async fn test_get_traffic() {
    let (app, _) = create_test_app();
    let (status, json) = get_json(app, "/api/traffic").await;

    assert_eq!(status, StatusCode::OK);
    let intensity = json["intensity"].as_str().unwrap();
    assert!(["low", "medium", "high"].contains(&intensity));
    assert_eq!(json["peakHours"].as_array().unwrap().len(), 2);
    assert!(json["recommendedWindow"].is_string());
}

#[tokio::test]
async fn test_get_location() {
    let (app, _) = create_test_app();
    let (status, json) = get_json(app.clone(), "/api/locations/industrial").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Industrial Zone Crossing");

    let (status, _) = get_json(app, "/api/locations/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Login tests
// ============================================================================

#[tokio::test]
async fn test_login_success() {
    let (app, _) = create_test_app();
    let (status, body) = post_login(app, r#"{"username":"asha","location":"downtown"}"#).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["username"], "asha");
    assert_eq!(json["locationName"], "Downtown Station Area");
    assert!(!json["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_login_missing_fields() {
    let (app, store) = create_test_app();
    let before = store.trains();

    let (status, body) = post_login(app.clone(), r#"{"username":"","location":"downtown"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("username"));

    let (status, body) = post_login(app, r#"{"username":"asha"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("location"));

    assert_eq!(store.trains(), before);
}
