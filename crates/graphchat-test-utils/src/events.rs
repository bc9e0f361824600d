use graphchat_core::{ChatEvent, EventSink, RequestState};
use parking_lot::Mutex;

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ChatEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ChatEvent> {
        self.events.lock().clone()
    }

    /// Only the state transitions, in emission order.
    pub fn states(&self) -> Vec<RequestState> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ChatEvent::StateChanged { state } => Some(*state),
                ChatEvent::MessageAppended { .. } => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: ChatEvent) {
        self.events.lock().push(event);
    }
}
