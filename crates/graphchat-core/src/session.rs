//! Chat session: conversation log plus the single in-flight request slot.

use crate::error::{FailureKind, GraphChatError};
use crate::events::{ChatEvent, EventSink};
use crate::store::ConversationStore;
use crate::trace::{NormalizedStep, normalize};
use crate::transport::Transport;
use crate::types::{Message, MessageId, SessionId};
use graphchat_protocol::{AnswerResponse, QuestionRequest};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

/// Assistant reply appended when a request fails.
pub const ERROR_REPLY: &str = "Sorry, I ran into an error. Please check the server logs.";
/// Notice shown when a question is submitted while another is in flight.
pub const BUSY_NOTICE: &str = "Please wait for the model to finish its response!";

/// Request lifecycle for one session.
///
/// `Succeeded` and `Failed` are reported as transitions; the session always
/// settles back to `Idle` before accepting another question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    InFlight(MessageId),
    Succeeded,
    Failed(FailureKind),
}

/// How an accepted request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Answered(MessageId),
    Failed(MessageId, FailureKind),
}

impl RequestOutcome {
    pub fn id(&self) -> MessageId {
        match self {
            RequestOutcome::Answered(id) | RequestOutcome::Failed(id, _) => *id,
        }
    }
}

struct SessionInner {
    id: SessionId,
    store: ConversationStore,
    state: Mutex<RequestState>,
    transport: Arc<dyn Transport>,
    events: Option<Arc<dyn EventSink>>,
}

/// Owns the conversation log and serializes questions to the backend.
///
/// Cloning is cheap and every clone shares the same log and request slot.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<SessionInner>,
}

impl ChatSession {
    /// Create a session that sends questions through `transport`.
    pub fn new(transport: Arc<dyn Transport>, events: Option<Arc<dyn EventSink>>) -> Self {
        let id = Uuid::new_v4();
        info!("created chat session (session_id={})", id);
        Self {
            inner: Arc::new(SessionInner {
                id,
                store: ConversationStore::new(),
                state: Mutex::new(RequestState::Idle),
                transport,
                events,
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    /// Current request state.
    pub fn state(&self) -> RequestState {
        *self.inner.state.lock()
    }

    /// Whether a request is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self.state(), RequestState::InFlight(_))
    }

    /// Snapshot of the conversation log.
    pub fn messages(&self) -> Vec<Message> {
        self.inner.store.all()
    }

    /// Read access to the conversation log.
    pub fn store(&self) -> &ConversationStore {
        &self.inner.store
    }

    /// Accept a question and append it to the log.
    ///
    /// Returns [`GraphChatError::EmptyQuestion`] for blank text and
    /// [`GraphChatError::ReentrancyRejected`] while another request is in
    /// flight; neither touches the log. The returned handle must be resolved
    /// to obtain the answer.
    pub fn begin(&self, text: &str) -> Result<PendingRequest, GraphChatError> {
        if text.trim().is_empty() {
            debug!("ignoring blank question (session_id={})", self.inner.id);
            return Err(GraphChatError::EmptyQuestion);
        }
        let id = Uuid::new_v4();
        let message = Message::user(id, text);
        {
            let mut state = self.inner.state.lock();
            if let RequestState::InFlight(active) = *state {
                info!(
                    "rejected question while busy (session_id={}, active_id={})",
                    self.inner.id, active
                );
                return Err(GraphChatError::ReentrancyRejected);
            }
            *state = RequestState::InFlight(id);
            self.inner.store.append(message.clone());
        }
        debug!(
            "accepted question (session_id={}, message_id={}, question_len={})",
            self.inner.id,
            id,
            text.len()
        );
        self.emit(ChatEvent::StateChanged {
            state: RequestState::InFlight(id),
        });
        self.emit(ChatEvent::MessageAppended { message });
        Ok(PendingRequest {
            session: self.clone(),
            id,
            question: text.to_string(),
            settled: false,
        })
    }

    /// Accept a question and wait for its answer.
    pub async fn submit(&self, text: &str) -> Result<RequestOutcome, GraphChatError> {
        let pending = self.begin(text)?;
        Ok(pending.resolve().await)
    }

    fn settle(&self, id: MessageId, result: Result<Answer, GraphChatError>) -> RequestOutcome {
        let (message, terminal, outcome) = match result {
            Ok(answer) => {
                let steps = answer.trace.as_ref().map_or(0, Vec::len);
                info!(
                    "request answered (session_id={}, message_id={}, steps={})",
                    self.inner.id, id, steps
                );
                (
                    Message::assistant(id, answer.text, answer.trace),
                    RequestState::Succeeded,
                    RequestOutcome::Answered(id),
                )
            }
            Err(err) => {
                // Rejections return from `begin` and never reach here.
                let kind = err.failure_kind().unwrap_or(FailureKind::Abandoned);
                warn!(
                    "request failed (session_id={}, message_id={}, kind={}, err={})",
                    self.inner.id, id, kind, err
                );
                (
                    Message::assistant(id, ERROR_REPLY, None),
                    RequestState::Failed(kind),
                    RequestOutcome::Failed(id, kind),
                )
            }
        };
        {
            let mut state = self.inner.state.lock();
            if *state != RequestState::InFlight(id) {
                warn!(
                    "settling request that is not in flight (session_id={}, message_id={}, state={:?})",
                    self.inner.id, id, *state
                );
            }
            self.inner.store.append(message.clone());
            *state = RequestState::Idle;
        }
        self.emit(ChatEvent::MessageAppended { message });
        self.emit(ChatEvent::StateChanged { state: terminal });
        self.emit(ChatEvent::StateChanged {
            state: RequestState::Idle,
        });
        outcome
    }

    fn emit(&self, event: ChatEvent) {
        if let Some(events) = &self.inner.events {
            events.emit(event);
        }
    }
}

/// An accepted question awaiting its answer.
///
/// Dropping the handle without resolving it settles the request as
/// abandoned, so every accepted question still gets an assistant reply.
pub struct PendingRequest {
    session: ChatSession,
    id: MessageId,
    question: String,
    settled: bool,
}

impl PendingRequest {
    /// Correlation id of the question.
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Send the question and append the answer or the error reply.
    pub async fn resolve(mut self) -> RequestOutcome {
        let request = QuestionRequest::new(self.question.as_str());
        let result = self
            .session
            .inner
            .transport
            .send(&request)
            .await
            .map_err(GraphChatError::from)
            .and_then(Answer::from_response);
        self.settled = true;
        self.session.settle(self.id, result)
    }
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        if !self.settled {
            self.settled = true;
            self.session
                .settle(self.id, Err(GraphChatError::Abandoned));
        }
    }
}

/// Answer text and normalized trace extracted from a response.
struct Answer {
    text: String,
    trace: Option<Vec<NormalizedStep>>,
}

impl Answer {
    fn from_response(response: AnswerResponse) -> Result<Self, GraphChatError> {
        let Some(text) = response.answer_text().map(str::to_string) else {
            return Err(match response.error {
                Some(error) => GraphChatError::Backend(error),
                None => GraphChatError::MalformedResponse(
                    "response carries neither output nor answer".to_string(),
                ),
            });
        };
        Ok(Self {
            text,
            trace: response
                .intermediate_steps
                .as_deref()
                .map(normalize),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphchat_protocol::RawStep;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn answer_prefers_output_and_normalizes_trace() {
        let mut response = AnswerResponse::with_output(
            "39",
            vec![RawStep::new("graph_qa", "age", json!("39"))],
        );
        response.answer = Some("legacy".to_string());
        let answer = Answer::from_response(response).expect("answer");
        assert_eq!(answer.text, "39");
        assert_eq!(answer.trace.map(|steps| steps.len()), Some(1));
    }

    #[test]
    fn legacy_answer_has_no_trace() {
        let answer = Answer::from_response(AnswerResponse::with_answer("42")).expect("answer");
        assert_eq!(answer.text, "42");
        assert!(answer.trace.is_none());
    }

    #[test]
    fn missing_answer_is_malformed_or_backend_error() {
        let malformed = Answer::from_response(AnswerResponse::default())
            .err()
            .and_then(|err| err.failure_kind());
        assert_eq!(malformed, Some(FailureKind::MalformedResponse));

        let response = AnswerResponse {
            error: Some("Chain not initialized".to_string()),
            ..AnswerResponse::default()
        };
        let backend = Answer::from_response(response)
            .err()
            .and_then(|err| err.failure_kind());
        assert_eq!(backend, Some(FailureKind::Server { status: None }));
    }
}
