//! Test helpers shared across graphchat crates.

pub mod events;
pub mod transport;

pub use events::RecordingSink;
pub use transport::{FailingTransport, GatedTransport, ScriptedTransport, sample_trace};
