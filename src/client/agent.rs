//! Client-side reconciliation state machine.
//!
//! `SyncAgent` holds no IO; the driver in [`super::runner`] feeds it
//! snapshots, events and visibility changes one at a time.

use chrono::{DateTime, Utc};

use crate::error::SyncError;
use crate::models::{GateStatus, Snapshot, Train};
use crate::protocol::{EventPayload, UpdateEvent};

use super::feed::Feed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Disconnected,
    Connecting,
    Synced,
    Reconciling,
}

/// How fresh state currently reaches the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Push,
    Poll,
}

/// Everything the dashboard renders from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalState {
    pub trains: Vec<Train>,
    pub gate: Option<GateStatus>,
    pub feed: Feed,
    /// Persistent connectivity notice; cleared by the next successful sync.
    pub notice: Option<String>,
    pub last_synced: Option<DateTime<Utc>>,
}

pub struct SyncAgent {
    state: SyncState,
    mode: SyncMode,
    visible: bool,
    local: LocalState,
}

impl Default for SyncAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncAgent {
    pub fn new() -> Self {
        Self {
            state: SyncState::Disconnected,
            mode: SyncMode::Push,
            visible: true,
            local: LocalState::default(),
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn local(&self) -> &LocalState {
        &self.local
    }

    pub fn local_mut(&mut self) -> &mut LocalState {
        &mut self.local
    }

    pub fn begin_connect(&mut self) {
        self.state = SyncState::Connecting;
    }

    /// The push channel could not be opened.
    pub fn channel_unavailable(&mut self, err: &SyncError) {
        tracing::info!("Push channel unavailable, polling instead: {}", err);
        self.state = SyncState::Disconnected;
        self.mode = SyncMode::Poll;
    }

    /// The push channel closed after it was established.
    pub fn channel_lost(&mut self) {
        tracing::warn!("Push channel closed, falling back to polling");
        self.state = SyncState::Disconnected;
        self.mode = SyncMode::Poll;
    }

    /// Replace local state wholesale with a snapshot from the push channel.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.replace(snapshot);
        self.state = SyncState::Synced;
        self.mode = SyncMode::Push;
    }

    /// Replace local state wholesale with a polled snapshot.
    ///
    /// In `Connecting` the channel is open but its snapshot was never
    /// applied (it arrived while hidden); the poll stands in for it.
    pub fn apply_poll(&mut self, snapshot: Snapshot) {
        self.replace(snapshot);
        if self.state == SyncState::Connecting {
            self.state = SyncState::Synced;
            self.mode = SyncMode::Push;
        }
    }

    fn replace(&mut self, snapshot: Snapshot) {
        self.local.trains = snapshot.trains;
        self.local.gate = Some(snapshot.gate);
        self.local.last_synced = Some(snapshot.timestamp);
        self.local.notice = None;
    }

    pub fn poll_failed(&mut self, err: &SyncError) {
        tracing::warn!("{}", err);
        if self.state != SyncState::Disconnected {
            return;
        }
        let since = match self.local.last_synced {
            Some(at) => format!("Showing data from {}", at.format("%H:%M:%S UTC")),
            None => "No data received yet".to_string(),
        };
        self.local.notice = Some(format!("Connection to the server lost. {}.", since));
    }

    /// Returns true when the surface just became visible and a full resync
    /// is due.
    pub fn set_visible(&mut self, visible: bool) -> bool {
        let resumed = visible && !self.visible;
        self.visible = visible;
        resumed
    }

    /// Reconcile one pushed event. Returns whether local state changed.
    ///
    /// Events are discarded while hidden; the resync on resume covers them.
    pub fn apply_event(&mut self, event: UpdateEvent) -> bool {
        if !self.visible {
            return false;
        }

        let UpdateEvent { payload, timestamp } = event;
        let payload = match payload {
            EventPayload::InitialData(snapshot) => {
                self.apply_snapshot(snapshot);
                return true;
            }
            other => other,
        };

        if self.state != SyncState::Synced {
            tracing::debug!("Ignoring event received in state {:?}", self.state);
            return false;
        }

        self.state = SyncState::Reconciling;
        match payload {
            EventPayload::TrainUpdate(train) => {
                self.local.feed.push(
                    "train",
                    format!("Train {}", train.train_number),
                    format!("{} is now {}", train.route, train.status.label()),
                    timestamp,
                );
                match self.local.trains.iter_mut().find(|t| t.id == train.id) {
                    Some(existing) => existing.status = train.status,
                    None => self.local.trains.push(train),
                }
            }
            EventPayload::GateUpdate(gate) => {
                self.local.feed.push(
                    "gate",
                    format!("Gate {}", gate.status.as_str()),
                    format!("{} is now {}", gate.location, gate.status.as_str()),
                    timestamp,
                );
                self.local.gate = Some(gate);
            }
            EventPayload::FeedUpdate(item) => {
                self.local
                    .feed
                    .push(item.icon, item.title, item.message, timestamp);
            }
            EventPayload::InitialData(_) => {}
        }
        self.local.last_synced = Some(timestamp);
        self.state = SyncState::Synced;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeedItem, GateState, TrainStatus};
    use crate::store::StateStore;

    fn synced_agent(store: &StateStore) -> SyncAgent {
        let mut agent = SyncAgent::new();
        agent.begin_connect();
        assert!(agent.apply_event(UpdateEvent::initial(store.snapshot())));
        agent
    }

    #[test]
    fn test_snapshot_replace_matches_server() {
        let store = StateStore::seeded();
        let agent = synced_agent(&store);
        let snapshot = store.snapshot();

        assert_eq!(agent.state(), SyncState::Synced);
        assert_eq!(agent.local().trains, snapshot.trains);
        assert_eq!(agent.local().gate.as_ref(), Some(&snapshot.gate));
    }

    #[test]
    fn test_snapshot_is_full_replace_not_merge() {
        let store = StateStore::seeded();
        let mut agent = SyncAgent::new();
        agent.local_mut().trains = vec![store.trains()[0].clone(); 9];

        agent.apply_poll(store.snapshot());
        assert_eq!(agent.local().trains, store.trains());
    }

    #[test]
    fn test_train_event_overwrites_by_id_and_adds_feed_entry() {
        let store = StateStore::seeded();
        let mut agent = synced_agent(&store);

        let train = store
            .apply_train_status_change("EXP-22222", TrainStatus::Delayed)
            .unwrap();
        assert!(agent.apply_event(UpdateEvent::new(EventPayload::TrainUpdate(train))));

        assert_eq!(agent.state(), SyncState::Synced);
        assert_eq!(agent.local().trains, store.trains());
        let entry = agent.local().feed.iter().next().unwrap();
        assert_eq!(entry.title, "Train EXP-22222");
        assert_eq!(entry.message, "Chennai-Kolkata Express is now Delayed");
    }

    #[test]
    fn test_gate_and_feed_events() {
        let store = StateStore::seeded();
        let mut agent = synced_agent(&store);

        let gate = store.apply_gate_status_change(GateState::Open);
        agent.apply_event(UpdateEvent::new(EventPayload::GateUpdate(gate.clone())));
        agent.apply_event(UpdateEvent::new(EventPayload::FeedUpdate(FeedItem {
            icon: "info".to_string(),
            title: "Maintenance".to_string(),
            message: "Signal work tonight".to_string(),
        })));

        assert_eq!(agent.local().gate, Some(gate));
        let titles: Vec<&str> = agent.local().feed.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Maintenance", "Gate OPEN"]);
    }

    #[test]
    fn test_incremental_event_before_snapshot_is_ignored() {
        let store = StateStore::seeded();
        let mut agent = SyncAgent::new();
        agent.begin_connect();

        let gate = store.apply_gate_status_change(GateState::Open);
        assert!(!agent.apply_event(UpdateEvent::new(EventPayload::GateUpdate(gate))));
        assert_eq!(agent.local().gate, None);
    }

    #[test]
    fn test_hidden_agent_discards_events_and_requests_resync() {
        let store = StateStore::seeded();
        let mut agent = synced_agent(&store);

        assert!(!agent.set_visible(false));
        let gate = store.apply_gate_status_change(GateState::Open);
        assert!(!agent.apply_event(UpdateEvent::new(EventPayload::GateUpdate(gate))));
        assert_eq!(agent.local().gate.as_ref().map(|g| g.status), Some(GateState::Closed));

        assert!(agent.set_visible(true));
        assert!(!agent.set_visible(true));
    }

    #[test]
    fn test_resync_poll_completes_handshake_missed_while_hidden() {
        let store = StateStore::seeded();
        let mut agent = SyncAgent::new();
        agent.begin_connect();

        agent.set_visible(false);
        assert!(!agent.apply_event(UpdateEvent::initial(store.snapshot())));
        assert_eq!(agent.state(), SyncState::Connecting);

        assert!(agent.set_visible(true));
        agent.apply_poll(store.snapshot());
        assert_eq!(agent.state(), SyncState::Synced);

        let gate = store.apply_gate_status_change(GateState::Open);
        assert!(agent.apply_event(UpdateEvent::new(EventPayload::GateUpdate(gate.clone()))));
        assert_eq!(agent.local().gate, Some(gate));
    }

    #[test]
    fn test_poll_keeps_disconnected_agent_polling() {
        let store = StateStore::seeded();
        let mut agent = SyncAgent::new();
        agent.begin_connect();
        agent.channel_unavailable(&SyncError::ChannelUnavailable("refused".to_string()));

        agent.apply_poll(store.snapshot());
        assert_eq!(agent.state(), SyncState::Disconnected);
        assert_eq!(agent.mode(), SyncMode::Poll);
    }

    #[test]
    fn test_poll_failure_after_channel_loss_sets_notice() {
        let store = StateStore::seeded();
        let mut agent = synced_agent(&store);

        agent.channel_lost();
        assert_eq!(agent.mode(), SyncMode::Poll);
        agent.poll_failed(&SyncError::Poll("connection refused".to_string()));
        let notice = agent.local().notice.clone().unwrap();
        assert!(notice.starts_with("Connection to the server lost."));

        agent.apply_poll(store.snapshot());
        assert_eq!(agent.local().notice, None);
    }
}
