use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reported running status of a train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainStatus {
    #[serde(rename = "ontime")]
    OnTime,
    Delayed,
    Approaching,
}

impl TrainStatus {
    pub const ALL: [TrainStatus; 3] = [
        TrainStatus::OnTime,
        TrainStatus::Delayed,
        TrainStatus::Approaching,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TrainStatus::OnTime => "On Time",
            TrainStatus::Delayed => "Delayed",
            TrainStatus::Approaching => "Approaching",
        }
    }
}

/// A scheduled train passing the monitored crossing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Train {
    pub id: String,
    pub train_number: String,
    pub arrival_time: String,
    pub gate_closure_time: String,
    /// Minutes the gate stays closed after arrival.
    pub crossing_duration: u32,
    pub status: TrainStatus,
    pub route: String,
    pub platform: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GateState {
    Open,
    Closed,
}

impl GateState {
    pub fn flipped(self) -> Self {
        match self {
            GateState::Open => GateState::Closed,
            GateState::Closed => GateState::Open,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GateState::Open => "OPEN",
            GateState::Closed => "CLOSED",
        }
    }
}

/// Status of the monitored level crossing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateStatus {
    pub id: String,
    pub status: GateState,
    pub last_updated: DateTime<Utc>,
    pub next_opening: Option<String>,
    pub location: String,
}

/// Point-in-time copy of every tracked entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub trains: Vec<Train>,
    pub gate: GateStatus,
    pub timestamp: DateTime<Utc>,
}

/// A human-readable notice pushed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub icon: String,
    pub title: String,
    pub message: String,
}

/// Response for the stats endpoint.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_trains: usize,
    pub on_time_trains: usize,
    pub delayed_trains: usize,
    pub gate_status: GateState,
    /// Minutes.
    pub average_wait_time: u32,
    pub trains_today: u32,
}

/// Request to start a dashboard session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub location: String,
    pub location_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationResponse {
    pub code: String,
    pub name: String,
}
