use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use crate::error::StoreError;
use crate::models::{GateState, GateStatus, Snapshot, Train, TrainStatus};

struct Inner {
    trains: Vec<Train>,
    gate: GateStatus,
}

/// Authoritative in-memory train and gate state.
///
/// Cloning the store clones the handle, not the data. Reads return owned
/// copies taken under a read lock, so a snapshot never contains a half
/// applied mutation.
///
/// Single-writer: only the update scheduler calls the `apply_*` methods.
/// Concurrent external writers are unsupported; the lock protects readers,
/// it does not arbitrate between writers.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<RwLock<Inner>>,
}

impl StateStore {
    pub fn new(trains: Vec<Train>, gate: GateStatus) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner { trains, gate })),
        }
    }

    /// Store populated with the reference sample data.
    pub fn seeded() -> Self {
        Self::new(seed_trains(), seed_gate())
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        // Writes are single field assignments, poisoning cannot tear them.
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> Snapshot {
        let inner = self.read();
        Snapshot {
            trains: inner.trains.clone(),
            gate: inner.gate.clone(),
            timestamp: Utc::now(),
        }
    }

    pub fn trains(&self) -> Vec<Train> {
        self.read().trains.clone()
    }

    pub fn gate(&self) -> GateStatus {
        self.read().gate.clone()
    }

    /// Set the status of one train. Only `status` changes.
    pub fn apply_train_status_change(
        &self,
        id: &str,
        status: TrainStatus,
    ) -> Result<Train, StoreError> {
        let mut inner = self.write();
        let train = inner
            .trains
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        train.status = status;
        Ok(train.clone())
    }

    /// Set the gate status and refresh its timestamp.
    pub fn apply_gate_status_change(&self, status: GateState) -> GateStatus {
        let mut inner = self.write();
        let now = Utc::now();
        inner.gate.status = status;
        if now > inner.gate.last_updated {
            inner.gate.last_updated = now;
        }
        inner.gate.clone()
    }
}

fn train(
    id: &str,
    arrival: &str,
    closure: &str,
    duration: u32,
    status: TrainStatus,
    route: &str,
    platform: &str,
) -> Train {
    Train {
        id: id.to_string(),
        train_number: id.to_string(),
        arrival_time: arrival.to_string(),
        gate_closure_time: closure.to_string(),
        crossing_duration: duration,
        status,
        route: route.to_string(),
        platform: platform.to_string(),
    }
}

pub fn seed_trains() -> Vec<Train> {
    vec![
        train("EXP-12345", "14:30", "14:25", 8, TrainStatus::OnTime, "Mumbai-Delhi Express", "3"),
        train(
            "LOC-67890",
            "14:45",
            "14:40",
            6,
            TrainStatus::Delayed,
            "Local Passenger Service",
            "1",
        ),
        train("FRT-11111", "15:15", "15:10", 12, TrainStatus::Approaching, "Freight Service", "2"),
        train(
            "EXP-22222",
            "15:45",
            "15:40",
            7,
            TrainStatus::OnTime,
            "Chennai-Kolkata Express",
            "4",
        ),
        train("PSG-33333", "16:20", "16:15", 9, TrainStatus::OnTime, "Inter-city Passenger", "1"),
    ]
}

pub fn seed_gate() -> GateStatus {
    GateStatus {
        id: "GATE-001".to_string(),
        status: GateState::Closed,
        last_updated: Utc::now(),
        next_opening: Some("14:38".to_string()),
        location: "Main Street Railway Crossing".to_string(),
    }
}
