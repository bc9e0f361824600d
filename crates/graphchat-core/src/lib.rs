//! Chat session controller for graph question answering.
//!
//! This crate owns the conversation log, the single in-flight request
//! lifecycle, trace normalization, and the stage view built from a trace.
//! Transports are injected behind the [`Transport`] trait.

pub mod error;
pub mod events;
pub mod session;
pub mod stages;
pub mod store;
pub mod trace;
pub mod transport;
pub mod types;

pub use error::{FailureKind, GraphChatError};
pub use events::{ChatEvent, EventSink};
pub use session::{
    BUSY_NOTICE, ChatSession, ERROR_REPLY, PendingRequest, RequestOutcome, RequestState,
};
pub use stages::{FINAL_STAGE_LABEL, ObservationView, QueryView, Stage, to_stages};
pub use store::ConversationStore;
pub use trace::{NormalizedObservation, NormalizedStep, SubQuery, normalize};
pub use transport::{
    ConnectionState, HttpTransport, Transport, TransportError, WsTransport, build_transport,
};
pub use types::{Message, MessageId, Role, SessionId};
