//! Fan-out of update events to connected clients.
//!
//! Every client owns a bounded queue. Publishing never waits on a client:
//! a queue that is full or closed gets its client dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::UpdateEvent;
use crate::store::StateStore;

pub type ClientId = Uuid;

/// Receiving half handed to a freshly registered client.
pub struct Registration {
    pub id: ClientId,
    /// First item is always the `initial_data` snapshot.
    pub receiver: mpsc::Receiver<Arc<UpdateEvent>>,
}

struct Registry {
    clients: HashMap<ClientId, mpsc::Sender<Arc<UpdateEvent>>>,
}

#[derive(Clone)]
pub struct Broadcaster {
    store: StateStore,
    registry: Arc<Mutex<Registry>>,
    queue_capacity: usize,
    handshake_timeout: Duration,
}

impl Broadcaster {
    pub fn new(store: StateStore, queue_capacity: usize, handshake_timeout: Duration) -> Self {
        Self {
            store,
            registry: Arc::new(Mutex::new(Registry {
                clients: HashMap::new(),
            })),
            queue_capacity: queue_capacity.max(1),
            handshake_timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Upper bound for delivering the initial snapshot to a new client.
    pub fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }

    /// Register a client. The snapshot is queued before the client joins the
    /// broadcast set, both under the registry lock, so every event published
    /// afterwards is ordered behind it.
    pub fn register(&self) -> Registration {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let id = Uuid::new_v4();

        let mut registry = self.lock();
        let initial = UpdateEvent::initial(self.store.snapshot());
        // Fresh queue with capacity >= 1, cannot be full.
        let _ = tx.try_send(Arc::new(initial));
        registry.clients.insert(id, tx);
        let count = registry.clients.len();
        drop(registry);

        tracing::info!("Client {} registered ({} connected)", id, count);
        Registration { id, receiver: rx }
    }

    /// Remove a client. Safe to call more than once.
    pub fn unregister(&self, id: ClientId) -> bool {
        let removed = self.lock().clients.remove(&id).is_some();
        if removed {
            tracing::info!("Client {} unregistered", id);
        }
        removed
    }

    /// Queue an event for every registered client. Returns how many clients
    /// accepted it.
    pub fn publish(&self, event: UpdateEvent) -> usize {
        let event = Arc::new(event);
        let mut registry = self.lock();
        let mut delivered = 0;

        registry.clients.retain(|id, tx| match tx.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Client {} is too slow, dropping it", id);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Client {} went away", id);
                false
            }
        });

        delivered
    }

    pub fn client_count(&self) -> usize {
        self.lock().clients.len()
    }
}
