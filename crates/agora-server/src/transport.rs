//! Delivery of facilitator notifications to SSE subscribers.

use agora_facilitator::{FacilitationEvent, Notifier};
use serde::Serialize;
use tokio::sync::broadcast;

/// One notification, tagged with the thread it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadNotification {
    pub thread_id: String,
    pub event: FacilitationEvent,
    pub payload: serde_json::Value,
}

/// [`Notifier`] backed by a broadcast channel.
///
/// Every subscriber sees every thread's notifications and filters for the
/// thread it is watching.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<ThreadNotification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ThreadNotification> {
        self.tx.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, thread_id: &str, event: FacilitationEvent, payload: serde_json::Value) {
        let notification = ThreadNotification {
            thread_id: thread_id.to_string(),
            event,
            payload,
        };
        // An error only means nobody is listening right now.
        if self.tx.send(notification).is_err() {
            tracing::debug!(thread_id, event = event.as_str(), "no notification subscribers");
        }
    }
}
