use crate::broadcast::Broadcaster;
use crate::config::Config;
use crate::store::StateStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: StateStore,
    pub broadcaster: Broadcaster,
    pub trains_today: u32,
}

impl AppState {
    pub fn new(store: StateStore, config: &Config) -> Self {
        let broadcaster =
            Broadcaster::new(store.clone(), config.client_queue, config.handshake_timeout);
        Self {
            store,
            broadcaster,
            trains_today: config.trains_today,
        }
    }
}
