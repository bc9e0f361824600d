//! Broadcast bus carrying session events to the TUI loop.

use graphchat_core::{ChatEvent, EventSink};
use log::debug;
use tokio::sync::broadcast;

/// Broadcast-backed event bus shared by every session the TUI creates.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<ChatEvent>,
}

impl EventBus {
    /// Create a new event bus with the given channel buffer size.
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer);
        debug!("tui event bus initialized (buffer={})", buffer);
        Self { sender }
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: ChatEvent) {
        let _ = self.sender.send(event);
    }
}
