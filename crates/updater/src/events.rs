//! Advisory lifecycle notifications.

use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 16;

/// Notification raised during an update cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateEvent {
    /// A newer version was found and is about to be downloaded.
    Download { version: String },
    /// A verified artifact is staged and ready for installation.
    UpdateReady { path: PathBuf },
    /// A recoverable step failed.
    Error { message: String },
    /// The installer accepted the staged artifact.
    Installed { version: String, path: PathBuf },
}

/// Fan-out of [`UpdateEvent`]s to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<UpdateEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UpdateEvent> {
        self.tx.subscribe()
    }

    /// Deliver `event` to current subscribers. Never blocks; dropped when
    /// nobody is listening.
    pub fn emit(&self, event: UpdateEvent) {
        trace!(?event, "emitting update event");
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
