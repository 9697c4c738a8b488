pub mod api;
pub mod session;
pub mod ws;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Snapshot pull and entity reads
        .route("/api/snapshot", get(api::get_snapshot))
        .route("/api/trains", get(api::get_trains))
        .route("/api/gate-status", get(api::get_gate_status))
        .route("/api/stats", get(api::get_stats))
        .route("/api/closures", get(api::get_closures))
        .route("/api/alerts", get(api::get_alerts))
        .route("/api/traffic", get(api::get_traffic))
        .route("/api/locations/{code}", get(api::get_location))
        // Session
        .route("/api/login", post(session::login))
        // Push channel
        .route("/ws", get(ws::upgrade))
        // Health check
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    clients: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        clients: state.broadcaster.client_count(),
    })
}
