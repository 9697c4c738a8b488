//! Periodic mutation of the state store.
//!
//! What changes is decided by a [`MutationTrigger`]; the scheduler only
//! applies the mutations and publishes one event per successful change.
//! Announcements skip the store and go out as feed items.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use chrono::{Local, NaiveTime};
use rand::{Rng, SeedableRng};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::broadcast::Broadcaster;
use crate::closures::{self, TrafficIntensity};
use crate::models::{FeedItem, GateState, Snapshot, TrainStatus};
use crate::protocol::{EventPayload, UpdateEvent};
use crate::store::StateStore;

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    TrainStatus { id: String, status: TrainStatus },
    Gate(GateState),
    Announce(FeedItem),
}

/// Source of state changes for each tick.
pub trait MutationTrigger: Send {
    fn mutations(&mut self, snapshot: &Snapshot) -> Vec<Mutation>;
}

/// Triggers run in order; their mutations are concatenated.
impl MutationTrigger for Vec<Box<dyn MutationTrigger>> {
    fn mutations(&mut self, snapshot: &Snapshot) -> Vec<Mutation> {
        self.iter_mut()
            .flat_map(|trigger| trigger.mutations(snapshot))
            .collect()
    }
}

/// Reference trigger: random train status and random gate flips.
pub struct RandomTrigger<R: Rng + Send = StdRng> {
    rng: R,
    train_probability: f64,
    gate_probability: f64,
}

impl RandomTrigger<StdRng> {
    pub fn from_entropy(train_probability: f64, gate_probability: f64) -> Self {
        Self::new(StdRng::from_entropy(), train_probability, gate_probability)
    }
}

impl<R: Rng + Send> RandomTrigger<R> {
    pub fn new(rng: R, train_probability: f64, gate_probability: f64) -> Self {
        Self {
            rng,
            train_probability: train_probability.clamp(0.0, 1.0),
            gate_probability: gate_probability.clamp(0.0, 1.0),
        }
    }
}

impl<R: Rng + Send> MutationTrigger for RandomTrigger<R> {
    fn mutations(&mut self, snapshot: &Snapshot) -> Vec<Mutation> {
        let mut out = Vec::new();

        if self.rng.gen_bool(self.train_probability) {
            if let Some(train) = snapshot.trains.choose(&mut self.rng) {
                let status = *TrainStatus::ALL
                    .choose(&mut self.rng)
                    .unwrap_or(&TrainStatus::OnTime);
                out.push(Mutation::TrainStatus {
                    id: train.id.clone(),
                    status,
                });
            }
        }

        if self.rng.gen_bool(self.gate_probability) {
            out.push(Mutation::Gate(snapshot.gate.status.flipped()));
        }

        out
    }
}

fn local_time() -> NaiveTime {
    Local::now().time()
}

/// Announces traffic intensity on the feed whenever it changes, including
/// the first tick after startup.
pub struct TrafficWatch<C = fn() -> NaiveTime> {
    clock: C,
    last: Option<TrafficIntensity>,
}

impl TrafficWatch {
    pub fn new() -> Self {
        Self::with_clock(local_time)
    }
}

impl Default for TrafficWatch {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: FnMut() -> NaiveTime + Send> TrafficWatch<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock, last: None }
    }
}

impl<C: FnMut() -> NaiveTime + Send> MutationTrigger for TrafficWatch<C> {
    fn mutations(&mut self, _snapshot: &Snapshot) -> Vec<Mutation> {
        let outlook = closures::traffic_outlook((self.clock)());
        if self.last == Some(outlook.intensity) {
            return Vec::new();
        }
        self.last = Some(outlook.intensity);

        let message = match outlook.intensity {
            TrafficIntensity::High => {
                "High traffic intensity detected. Consider alternative routes.".to_string()
            }
            _ => format!("Recommended travel window: {}", outlook.recommended_window),
        };
        vec![Mutation::Announce(FeedItem {
            icon: "traffic".to_string(),
            title: format!("Traffic {}", outlook.intensity.label()),
            message,
        })]
    }
}

pub struct UpdateScheduler {
    store: StateStore,
    broadcaster: Broadcaster,
    trigger: Box<dyn MutationTrigger>,
    interval: Duration,
}

impl UpdateScheduler {
    pub fn new(
        store: StateStore,
        broadcaster: Broadcaster,
        trigger: Box<dyn MutationTrigger>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            broadcaster,
            trigger,
            interval,
        }
    }

    /// Run one tick. Returns the events that were published.
    pub fn tick(&mut self) -> Vec<UpdateEvent> {
        let snapshot = self.store.snapshot();
        let mut events = Vec::new();

        for mutation in self.trigger.mutations(&snapshot) {
            let payload = match mutation {
                Mutation::TrainStatus { id, status } => {
                    match self.store.apply_train_status_change(&id, status) {
                        Ok(train) => {
                            tracing::info!("Train {} is now {}", train.id, status.label());
                            EventPayload::TrainUpdate(train)
                        }
                        Err(e) => {
                            tracing::warn!("Skipping train mutation: {}", e);
                            continue;
                        }
                    }
                }
                Mutation::Gate(status) => {
                    let gate = self.store.apply_gate_status_change(status);
                    tracing::info!("Gate {} is now {}", gate.id, gate.status.as_str());
                    EventPayload::GateUpdate(gate)
                }
                Mutation::Announce(item) => {
                    tracing::info!("Announcing: {}", item.title);
                    EventPayload::FeedUpdate(item)
                }
            };

            let event = UpdateEvent::new(payload);
            let delivered = self.broadcaster.publish(event.clone());
            tracing::debug!("Published {:?} to {} clients", event.kind(), delivered);
            events.push(event);
        }

        events
    }

    /// Run ticks until `shutdown` fires or its sender is dropped.
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; state starts from the seed.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick();
                }
                _ = &mut shutdown => {
                    tracing::info!("Update scheduler stopped");
                    break;
                }
            }
        }
    }

    pub fn spawn(self) -> SchedulerHandle {
        let (stop, shutdown) = oneshot::channel();
        let task = tokio::spawn(self.run(shutdown));
        SchedulerHandle { stop, task }
    }
}

/// Handle to a running scheduler task.
pub struct SchedulerHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the scheduler and wait for the in-flight tick to finish.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            tracing::error!("Update scheduler task failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::EventKind;
    use crate::store::{seed_gate, seed_trains};
    use std::collections::VecDeque;

    /// Replays a fixed list of per-tick mutations.
    struct ScriptedTrigger {
        ticks: VecDeque<Vec<Mutation>>,
    }

    impl ScriptedTrigger {
        fn new(ticks: Vec<Vec<Mutation>>) -> Box<Self> {
            Box::new(Self {
                ticks: ticks.into(),
            })
        }
    }

    impl MutationTrigger for ScriptedTrigger {
        fn mutations(&mut self, _snapshot: &Snapshot) -> Vec<Mutation> {
            self.ticks.pop_front().unwrap_or_default()
        }
    }

    fn three_train_store() -> StateStore {
        StateStore::new(seed_trains().into_iter().take(3).collect(), seed_gate())
    }

    fn scheduler(
        store: &StateStore,
        trigger: Box<dyn MutationTrigger>,
    ) -> (UpdateScheduler, Broadcaster) {
        let hub = Broadcaster::new(store.clone(), 16, Duration::from_secs(5));
        let scheduler =
            UpdateScheduler::new(store.clone(), hub.clone(), trigger, Duration::from_secs(30));
        (scheduler, hub)
    }

    #[tokio::test]
    async fn test_tick_applies_train_mutation_and_emits_one_event() {
        let store = three_train_store();
        let trigger = ScriptedTrigger::new(vec![vec![Mutation::TrainStatus {
            id: "LOC-67890".to_string(),
            status: TrainStatus::Approaching,
        }]]);
        let (mut scheduler, hub) = scheduler(&store, trigger);
        let mut client = hub.register();

        let events = scheduler.tick();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), EventKind::TrainStatusChanged);
        match &events[0].payload {
            EventPayload::TrainUpdate(train) => assert_eq!(train.id, "LOC-67890"),
            other => panic!("unexpected payload: {:?}", other),
        }

        let snapshot = store.snapshot();
        let statuses: Vec<TrainStatus> = snapshot.trains.iter().map(|t| t.status).collect();
        assert_eq!(
            statuses,
            vec![
                TrainStatus::OnTime,
                TrainStatus::Approaching,
                TrainStatus::Approaching
            ]
        );

        let _ = client.receiver.recv().await.unwrap();
        let pushed = client.receiver.recv().await.unwrap();
        assert_eq!(*pushed, events[0]);
    }

    #[test]
    fn test_empty_tick_is_noop() {
        let store = three_train_store();
        let before = store.trains();
        let (mut scheduler, _hub) = scheduler(&store, ScriptedTrigger::new(vec![vec![]]));

        assert!(scheduler.tick().is_empty());
        assert_eq!(store.trains(), before);
    }

    #[test]
    fn test_unknown_train_is_skipped_and_tick_continues() {
        let store = three_train_store();
        let trigger = ScriptedTrigger::new(vec![vec![
            Mutation::TrainStatus {
                id: "GHOST-1".to_string(),
                status: TrainStatus::Delayed,
            },
            Mutation::Gate(GateState::Open),
        ]]);
        let (mut scheduler, _hub) = scheduler(&store, trigger);

        let events = scheduler.tick();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), EventKind::GateStatusChanged);
        assert_eq!(store.gate().status, GateState::Open);
    }

    #[test]
    fn test_random_trigger_respects_probabilities() {
        let snapshot = three_train_store().snapshot();

        let mut never = RandomTrigger::new(StdRng::seed_from_u64(7), 0.0, 0.0);
        for _ in 0..50 {
            assert!(never.mutations(&snapshot).is_empty());
        }

        let mut always = RandomTrigger::new(StdRng::seed_from_u64(7), 1.0, 1.0);
        let mutations = always.mutations(&snapshot);
        assert_eq!(mutations.len(), 2);
        match &mutations[0] {
            Mutation::TrainStatus { id, .. } => {
                assert!(snapshot.trains.iter().any(|t| &t.id == id))
            }
            other => panic!("unexpected mutation: {:?}", other),
        }
        assert_eq!(mutations[1], Mutation::Gate(GateState::Open));
    }

    #[test]
    fn test_announcement_publishes_feed_item_without_touching_store() {
        let store = three_train_store();
        let before = store.snapshot();
        let item = FeedItem {
            icon: "info".to_string(),
            title: "Signal maintenance".to_string(),
            message: "Expect short delays tonight".to_string(),
        };
        let trigger = ScriptedTrigger::new(vec![vec![Mutation::Announce(item.clone())]]);
        let (mut scheduler, _hub) = scheduler(&store, trigger);

        let events = scheduler.tick();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), EventKind::FeedItemAdded);
        assert_eq!(events[0].payload, EventPayload::FeedUpdate(item));
        assert_eq!(store.trains(), before.trains);
        assert_eq!(store.gate(), before.gate);
    }

    #[test]
    fn test_traffic_watch_announces_changes_only() {
        let snapshot = three_train_store().snapshot();
        let mut times = vec![(8, 0), (8, 30), (10, 5), (10, 6)]
            .into_iter()
            .map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0).unwrap());
        let fallback = NaiveTime::from_hms_opt(10, 7, 0).unwrap();
        let mut watch = TrafficWatch::with_clock(move || times.next().unwrap_or(fallback));

        let first = watch.mutations(&snapshot);
        match first.as_slice() {
            [Mutation::Announce(item)] => {
                assert_eq!(item.title, "Traffic high");
                assert!(item.message.starts_with("High traffic"));
            }
            other => panic!("unexpected mutations: {:?}", other),
        }
        assert!(watch.mutations(&snapshot).is_empty());

        match watch.mutations(&snapshot).as_slice() {
            [Mutation::Announce(item)] => {
                assert_eq!(item.title, "Traffic medium");
                assert_eq!(item.message, "Recommended travel window: Now - Good time to travel");
            }
            other => panic!("unexpected mutations: {:?}", other),
        }
        assert!(watch.mutations(&snapshot).is_empty());
    }

    #[test]
    fn test_combined_triggers_concatenate_in_order() {
        let snapshot = three_train_store().snapshot();
        let mut triggers: Vec<Box<dyn MutationTrigger>> = vec![
            ScriptedTrigger::new(vec![vec![Mutation::Gate(GateState::Open)]]),
            ScriptedTrigger::new(vec![vec![Mutation::TrainStatus {
                id: "EXP-12345".to_string(),
                status: TrainStatus::Delayed,
            }]]),
        ];

        let mutations = triggers.mutations(&snapshot);
        assert_eq!(mutations.len(), 2);
        assert_eq!(mutations[0], Mutation::Gate(GateState::Open));
        assert!(triggers.mutations(&snapshot).is_empty());
    }

    #[tokio::test]
    async fn test_spawned_scheduler_shuts_down() {
        let store = three_train_store();
        let (scheduler, _hub) = scheduler(&store, ScriptedTrigger::new(vec![]));
        let handle = scheduler.spawn();

        tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
            .await
            .expect("scheduler should stop promptly");
    }
}
