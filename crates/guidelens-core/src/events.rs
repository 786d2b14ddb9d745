use std::sync::Arc;

use guidelens_schema::SessionEvent;
use tokio::sync::{mpsc, RwLock};

type Subscriber = mpsc::Sender<SessionEvent>;

/// Fan-out of session state transitions to observers.
///
/// Delivery is best-effort: a subscriber whose channel is full misses the
/// event rather than blocking the session owner.
#[derive(Clone)]
pub struct SessionEvents {
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
    capacity: usize,
}

impl SessionEvents {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(Vec::new())),
            capacity,
        }
    }

    pub async fn subscribe(&self) -> mpsc::Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.subscribers.write().await.push(tx);
        rx
    }

    pub async fn publish(&self, event: SessionEvent) {
        let subs = self.subscribers.read().await;
        for tx in subs.iter() {
            let _ = tx.try_send(event.clone());
        }
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new(64)
    }
}
