//! Error types for the chat session controller.

use crate::transport::TransportError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while submitting a question or reconciling its response.
///
/// Only [`GraphChatError::ReentrancyRejected`] and
/// [`GraphChatError::EmptyQuestion`] ever reach a caller; the others are
/// folded into an assistant error message by the session.
#[derive(Debug, Error)]
pub enum GraphChatError {
    /// The backend could not be reached or answered with a failure status.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// The backend reported an error instead of an answer.
    #[error("backend error: {0}")]
    Backend(String),
    /// The response carried no answer text.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    /// A request is already in flight for this session.
    #[error("a request is already in flight")]
    ReentrancyRejected,
    /// The question was blank after trimming.
    #[error("question is empty")]
    EmptyQuestion,
    /// The pending request was dropped before it settled.
    #[error("request abandoned before it settled")]
    Abandoned,
}

impl GraphChatError {
    /// Classify the error for the session's failed state.
    ///
    /// Returns `None` for submissions rejected before a request was accepted.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            GraphChatError::Transport(err) => Some(FailureKind::from(err)),
            GraphChatError::Backend(_) => Some(FailureKind::Server { status: None }),
            GraphChatError::MalformedResponse(_) => Some(FailureKind::MalformedResponse),
            GraphChatError::Abandoned => Some(FailureKind::Abandoned),
            GraphChatError::ReentrancyRejected | GraphChatError::EmptyQuestion => None,
        }
    }
}

/// Why a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FailureKind {
    /// Connection could not be established or broke mid-request.
    Network,
    /// The request exceeded the transport timeout.
    Timeout,
    /// The backend answered with a failure status or an error payload.
    Server { status: Option<u16> },
    /// The payload did not decode or carried no answer.
    MalformedResponse,
    /// The pending request was dropped before the transport settled.
    Abandoned,
}

impl From<&TransportError> for FailureKind {
    fn from(err: &TransportError) -> Self {
        match err {
            TransportError::Network(_) | TransportError::Closed => FailureKind::Network,
            TransportError::Timeout(_) => FailureKind::Timeout,
            TransportError::Status { status, .. } => FailureKind::Server {
                status: Some(*status),
            },
            TransportError::Malformed(_) => FailureKind::MalformedResponse,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Network => write!(f, "network"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Server { status: Some(status) } => write!(f, "server ({status})"),
            FailureKind::Server { status: None } => write!(f, "server"),
            FailureKind::MalformedResponse => write!(f, "malformed response"),
            FailureKind::Abandoned => write!(f, "abandoned"),
        }
    }
}
