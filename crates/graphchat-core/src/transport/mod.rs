//! Transports that carry a question to the backend and bring back its answer.

mod http;
mod websocket;

pub use http::HttpTransport;
pub use websocket::{ConnectionState, WsTransport};

use async_trait::async_trait;
use graphchat_config::{BackendConfig, TransportKind};
use graphchat_protocol::{AnswerResponse, QuestionRequest};
use std::sync::Arc;
use thiserror::Error;

/// Failures raised by a transport before a response body is available.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("transport closed")]
    Closed,
}

/// One request, one response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a question and wait for the decoded response.
    async fn send(&self, request: &QuestionRequest) -> Result<AnswerResponse, TransportError>;
}

/// Build the transport selected by the backend config.
///
/// WebSocket transports connect eagerly; a failed connection is an error here
/// rather than on the first question.
pub async fn build_transport(backend: &BackendConfig) -> Result<Arc<dyn Transport>, TransportError> {
    match backend.transport {
        TransportKind::Http => Ok(Arc::new(HttpTransport::from_config(backend)?)),
        TransportKind::Websocket => Ok(Arc::new(WsTransport::from_config(backend).await?)),
    }
}
