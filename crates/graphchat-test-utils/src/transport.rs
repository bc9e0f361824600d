use async_trait::async_trait;
use graphchat_core::{Transport, TransportError};
use graphchat_protocol::{AnswerResponse, QuestionRequest, RawStep};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};

/// Replies with queued results in order; fails with `Closed` once drained.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<AnswerResponse, TransportError>>>,
    questions: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Result<AnswerResponse, TransportError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            questions: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(response: AnswerResponse) -> Self {
        Self::new(vec![Ok(response)])
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &QuestionRequest) -> Result<AnswerResponse, TransportError> {
        self.questions.lock().push(request.question.clone());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or(Err(TransportError::Closed))
    }
}

/// Holds every request until the test releases it.
pub struct GatedTransport {
    response: AnswerResponse,
    started: Notify,
    gate: Semaphore,
    questions: Mutex<Vec<String>>,
}

impl GatedTransport {
    pub fn new(response: AnswerResponse) -> Arc<Self> {
        Arc::new(Self {
            response,
            started: Notify::new(),
            gate: Semaphore::new(0),
            questions: Mutex::new(Vec::new()),
        })
    }

    /// Wait until a request has reached the transport.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    /// Let one held request complete.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().clone()
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn send(&self, request: &QuestionRequest) -> Result<AnswerResponse, TransportError> {
        self.questions.lock().push(request.question.clone());
        self.started.notify_one();
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| TransportError::Closed)?;
        permit.forget();
        Ok(self.response.clone())
    }
}

/// Always fails with a fresh copy of the configured error.
pub struct FailingTransport {
    make_error: fn() -> TransportError,
}

impl FailingTransport {
    pub fn new(make_error: fn() -> TransportError) -> Self {
        Self { make_error }
    }

    pub fn network() -> Self {
        Self::new(|| TransportError::Network("connection refused".to_string()))
    }
}

#[async_trait]
impl Transport for FailingTransport {
    async fn send(&self, _request: &QuestionRequest) -> Result<AnswerResponse, TransportError> {
        Err((self.make_error)())
    }
}

/// Two-step agent trace: a nested QA chain call followed by a plain tool call.
pub fn sample_trace() -> Vec<RawStep> {
    vec![
        RawStep::new(
            "graph_qa",
            "What is the age of Luka Doncic and LeBron James?",
            json!({
                "query": "What is the age of Luka Doncic and LeBron James?",
                "result": "Luka Doncic is 25 and LeBron James is 39.",
                "intermediate_steps": [
                    { "query": "cypher\nMATCH (p:Player) WHERE p.name IN ['Luka Doncic', 'LeBron James'] RETURN p.name, p.age" },
                    { "context": [
                        { "p.name": "Luka Doncic", "p.age": 25 },
                        { "p.name": "LeBron James", "p.age": 39 }
                    ] }
                ]
            }),
        ),
        RawStep::new("calculator", "39 - 25", json!("14")),
    ]
}
