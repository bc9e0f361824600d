//! TUI event types for input and session notifications.

use crossterm::event::KeyEvent;
use graphchat_core::ChatEvent;

/// Application event emitted by input handlers or the session event bus.
#[derive(Debug)]
pub enum AppEvent {
    /// Keyboard input event.
    Input(KeyEvent),
    /// Periodic tick event.
    Tick,
    /// Notification from the chat session.
    Session(ChatEvent),
    /// Scroll event in the chat view.
    Scroll(i16),
}
