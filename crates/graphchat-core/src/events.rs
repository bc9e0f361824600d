//! Session events pushed to views.

use crate::session::RequestState;
use crate::types::Message;

/// Change notifications emitted by a [`crate::ChatSession`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// A message was appended to the conversation log.
    MessageAppended { message: Message },
    /// The request state machine moved.
    StateChanged { state: RequestState },
}

/// Sink for session events.
pub trait EventSink: Send + Sync {
    /// Deliver an event to downstream listeners.
    fn emit(&self, event: ChatEvent);
}
