//! Messages carried over the persistent channel.
//!
//! On the wire every message is a JSON object
//! `{"type": ..., "data": ..., "timestamp": ...}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{FeedItem, GateStatus, Snapshot, Train};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    InitialSnapshot,
    TrainStatusChanged,
    GateStatusChanged,
    FeedItemAdded,
}

/// Payload of an update, tagged with its wire `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventPayload {
    InitialData(Snapshot),
    TrainUpdate(Train),
    GateUpdate(GateStatus),
    /// Scheduler announcements, e.g. traffic changes.
    FeedUpdate(FeedItem),
}

/// A change notification in transit from the broadcaster to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateEvent {
    #[serde(flatten)]
    pub payload: EventPayload,
    pub timestamp: DateTime<Utc>,
}

impl UpdateEvent {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            payload,
            timestamp: Utc::now(),
        }
    }

    pub fn initial(snapshot: Snapshot) -> Self {
        Self {
            timestamp: snapshot.timestamp,
            payload: EventPayload::InitialData(snapshot),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self.payload {
            EventPayload::InitialData(_) => EventKind::InitialSnapshot,
            EventPayload::TrainUpdate(_) => EventKind::TrainStatusChanged,
            EventPayload::GateUpdate(_) => EventKind::GateStatusChanged,
            EventPayload::FeedUpdate(_) => EventKind::FeedItemAdded,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
