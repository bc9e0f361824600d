//! WebSocket transport over a single long-lived connection.

use super::{Transport, TransportError};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use graphchat_config::BackendConfig;
use graphchat_protocol::{AnswerResponse, QuestionRequest};
use log::{debug, info, warn};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Lifecycle of a WebSocket transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Ready,
    Closed,
}

/// Sends each question as one JSON text frame and reads the next text frame
/// as its answer.
///
/// The connection is opened by [`WsTransport::connect`] and stays owned by
/// the transport until [`WsTransport::close`] or a connection failure.
pub struct WsTransport {
    url: String,
    timeout: Duration,
    stream: Mutex<Option<WsStream>>,
}

impl WsTransport {
    /// Open a connection to `url`.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let (stream, _response) = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| TransportError::Timeout(format!("connecting to {url}")))?
            .map_err(|err| TransportError::Network(err.to_string()))?;
        info!("websocket connected (url={})", url);
        Ok(Self {
            url: url.to_string(),
            timeout,
            stream: Mutex::new(Some(stream)),
        })
    }

    /// Open a connection using backend settings.
    pub async fn from_config(backend: &BackendConfig) -> Result<Self, TransportError> {
        Self::connect(
            &backend.websocket_url(),
            Duration::from_secs(backend.timeout_secs),
        )
        .await
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> ConnectionState {
        if self.stream.lock().await.is_some() {
            ConnectionState::Ready
        } else {
            ConnectionState::Closed
        }
    }

    /// Close the connection. Closing twice is a no-op.
    pub async fn close(&self) -> Result<(), TransportError> {
        let Some(mut stream) = self.stream.lock().await.take() else {
            return Ok(());
        };
        info!("closing websocket (url={})", self.url);
        stream
            .close(None)
            .await
            .map_err(|err| TransportError::Network(err.to_string()))
    }

    async fn exchange(stream: &mut WsStream, payload: String) -> Result<AnswerResponse, TransportError> {
        stream
            .send(Message::Text(payload))
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(&text)
                        .map_err(|err| TransportError::Malformed(err.to_string()));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    return serde_json::from_slice(&bytes)
                        .map_err(|err| TransportError::Malformed(err.to_string()));
                }
                Some(Ok(Message::Close(_))) | None => return Err(TransportError::Closed),
                Some(Ok(_)) => continue,
                Some(Err(err)) => return Err(TransportError::Network(err.to_string())),
            }
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&self, request: &QuestionRequest) -> Result<AnswerResponse, TransportError> {
        let payload = serde_json::to_string(request)
            .map_err(|err| TransportError::Malformed(err.to_string()))?;
        let mut guard = self.stream.lock().await;
        // Held outside the slot until the exchange settles, so a cancelled
        // send leaves the transport closed.
        let Some(mut stream) = guard.take() else {
            warn!("send on closed websocket (url={})", self.url);
            return Err(TransportError::Closed);
        };
        debug!(
            "sending question frame (url={}, question_len={})",
            self.url,
            request.question.len()
        );
        let result =
            match tokio::time::timeout(self.timeout, Self::exchange(&mut stream, payload)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(format!(
                    "no answer within {}s",
                    self.timeout.as_secs()
                ))),
            };
        // Anything but a decode failure leaves the stream out of step.
        match &result {
            Ok(_) | Err(TransportError::Malformed(_)) => *guard = Some(stream),
            Err(err) => warn!("websocket exchange failed (url={}, err={})", self.url, err),
        }
        result
    }
}
