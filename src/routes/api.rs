use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use serde::Serialize;

use crate::closures::{self, Alert, ClosureWindow, TrafficOutlook};
use crate::locations::location_name;
use crate::models::{GateStatus, LocationResponse, Snapshot, StatsResponse, Train, TrainStatus};
use crate::state::AppState;

/// GET /api/snapshot - Full state for a client poll.
pub async fn get_snapshot(State(state): State<AppState>) -> Json<Snapshot> {
    Json(state.store.snapshot())
}

/// GET /api/trains
pub async fn get_trains(State(state): State<AppState>) -> Json<Vec<Train>> {
    Json(state.store.trains())
}

/// GET /api/gate-status
pub async fn get_gate_status(State(state): State<AppState>) -> Json<GateStatus> {
    Json(state.store.gate())
}

/// GET /api/stats - Counters derived from the current snapshot.
pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let snapshot = state.store.snapshot();
    let count = |status: TrainStatus| {
        snapshot
            .trains
            .iter()
            .filter(|t| t.status == status)
            .count()
    };

    Json(StatsResponse {
        total_trains: snapshot.trains.len(),
        on_time_trains: count(TrainStatus::OnTime),
        delayed_trains: count(TrainStatus::Delayed),
        gate_status: snapshot.gate.status,
        average_wait_time: closures::average_wait_minutes(&snapshot.trains),
        trains_today: state.trains_today,
    })
}

#[derive(Debug, Serialize)]
pub struct GetClosuresResponse {
    pub closures: Vec<ClosureWindow>,
}

/// GET /api/closures - Upcoming gate closures in local time.
pub async fn get_closures(State(state): State<AppState>) -> Json<GetClosuresResponse> {
    let now = Local::now().time();
    Json(GetClosuresResponse {
        closures: closures::closure_schedule(&state.store.trains(), now),
    })
}

#[derive(Debug, Serialize)]
pub struct GetAlertsResponse {
    pub alerts: Vec<Alert>,
}

/// GET /api/alerts
pub async fn get_alerts(State(state): State<AppState>) -> Json<GetAlertsResponse> {
    let now = Local::now().time();
    Json(GetAlertsResponse {
        alerts: closures::alerts(&state.store.trains(), now),
    })
}

/// GET /api/traffic - Traffic intensity and travel advice for the current hour.
pub async fn get_traffic() -> Json<TrafficOutlook> {
    Json(closures::traffic_outlook(Local::now().time()))
}

/// GET /api/locations/{code} - Display name for a location code.
pub async fn get_location(Path(code): Path<String>) -> Response {
    match location_name(&code) {
        Some(name) => Json(LocationResponse {
            code,
            name: name.to_string(),
        })
        .into_response(),
        None => (StatusCode::NOT_FOUND, "Unknown location").into_response(),
    }
}
