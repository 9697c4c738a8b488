pub mod broadcast;
pub mod client;
pub mod closures;
pub mod config;
pub mod error;
pub mod locations;
pub mod models;
pub mod protocol;
pub mod routes;
pub mod scheduler;
pub mod state;
pub mod store;

pub use broadcast::{Broadcaster, Registration};
pub use config::{ClientConfig, Config};
pub use error::{SessionError, StoreError, SyncError, ValidationError};
pub use models::{GateState, GateStatus, Snapshot, Train, TrainStatus};
pub use protocol::{EventKind, EventPayload, UpdateEvent};
pub use routes::create_router;
pub use scheduler::{MutationTrigger, RandomTrigger, TrafficWatch, UpdateScheduler};
pub use state::AppState;
pub use store::StateStore;
