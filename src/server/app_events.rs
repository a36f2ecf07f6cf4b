use tokio::sync::broadcast;
use tracing::trace;

use crate::db::AppRecord;

pub const APP_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Fans out every applied app record change to websocket subscribers.
#[derive(Debug, Clone)]
pub struct AppEventBroadcaster {
    app_updates_tx: broadcast::Sender<AppRecord>,
}

impl Default for AppEventBroadcaster {
    fn default() -> Self {
        Self::new(APP_EVENT_CHANNEL_CAPACITY)
    }
}

impl AppEventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (app_updates_tx, _) = broadcast::channel(capacity);
        Self { app_updates_tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppRecord> {
        self.app_updates_tx.subscribe()
    }

    pub fn publish(&self, record: &AppRecord) {
        // No subscribers is the common case.
        if self.app_updates_tx.send(record.clone()).is_err() {
            trace!(app_id = record.id, "No subscribers for app update.");
        }
    }
}
