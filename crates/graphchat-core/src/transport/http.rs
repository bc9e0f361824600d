//! HTTP transport: one POST per question.

use super::{Transport, TransportError};
use async_trait::async_trait;
use graphchat_config::BackendConfig;
use graphchat_protocol::{AnswerResponse, QuestionRequest};
use log::{debug, warn};
use std::time::Duration;

/// Longest body excerpt kept in error messages.
const BODY_EXCERPT_LIMIT: usize = 200;

/// Posts `{"question": ...}` to the backend's question endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    /// Create a transport for `endpoint` with a client-side timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Network(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Create a transport from backend settings.
    pub fn from_config(backend: &BackendConfig) -> Result<Self, TransportError> {
        Self::new(
            backend.endpoint_url(),
            Duration::from_secs(backend.timeout_secs),
        )
    }

    /// URL questions are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &QuestionRequest) -> Result<AnswerResponse, TransportError> {
        debug!(
            "posting question (endpoint={}, question_len={})",
            self.endpoint,
            request.question.len()
        );
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            let message = serde_json::from_str::<AnswerResponse>(&body)
                .ok()
                .and_then(|payload| payload.error)
                .unwrap_or_else(|| excerpt(&body));
            warn!(
                "backend request failed (endpoint={}, status={}, error={})",
                self.endpoint, status, message
            );
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str::<AnswerResponse>(&body).map_err(|err| {
            warn!(
                "failed to decode backend response (endpoint={}, err={})",
                self.endpoint, err
            );
            TransportError::Malformed(err.to_string())
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_decode() || err.is_body() {
        TransportError::Malformed(err.to_string())
    } else {
        TransportError::Network(err.to_string())
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT_LIMIT) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
