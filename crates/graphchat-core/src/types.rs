//! Core data types shared across the session API.

use crate::trace::NormalizedStep;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a chat session.
pub type SessionId = Uuid;
/// Correlation id shared by a question and its answer.
pub type MessageId = Uuid;

/// Speaker role for a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User-authored message.
    User,
    /// Assistant-authored message.
    Assistant,
}

impl Role {
    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn in the conversation log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Correlation id shared with the paired message.
    pub id: MessageId,
    /// Role that produced the message.
    pub role: Role,
    /// Display text, plain or Markdown.
    pub content: String,
    /// Normalized tool-use trace; only ever set on assistant messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<NormalizedStep>>,
    /// Timestamp for the message.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Build a user message.
    pub fn user(id: MessageId, content: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::User,
            content: content.into(),
            trace: None,
            created_at: Utc::now(),
        }
    }

    /// Build an assistant message with an optional trace.
    pub fn assistant(
        id: MessageId,
        content: impl Into<String>,
        trace: Option<Vec<NormalizedStep>>,
    ) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: content.into(),
            trace,
            created_at: Utc::now(),
        }
    }

    /// Whether the message has trace steps worth showing.
    ///
    /// An absent trace and an empty trace are the same display state.
    pub fn has_trace(&self) -> bool {
        self.trace.as_ref().is_some_and(|steps| !steps.is_empty())
    }

    /// Trace steps, empty when absent.
    pub fn steps(&self) -> &[NormalizedStep] {
        self.trace.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::NormalizedObservation;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_and_absent_traces_are_hidden() {
        let id = Uuid::new_v4();
        assert!(!Message::assistant(id, "39", None).has_trace());
        assert!(!Message::assistant(id, "39", Some(Vec::new())).has_trace());
        let step = NormalizedStep {
            tool: "graph_qa".to_string(),
            input: "age".to_string(),
            observation: NormalizedObservation::PlainText("39".to_string()),
        };
        let message = Message::assistant(id, "39", Some(vec![step]));
        assert!(message.has_trace());
        assert_eq!(message.steps().len(), 1);
    }

    #[test]
    fn role_serializes_lowercase() {
        let message = Message::user(Uuid::new_v4(), "hi");
        let value = serde_json::to_value(&message).expect("encode");
        assert_eq!(value["role"], "user");
        assert!(value.get("trace").is_none());
        assert_eq!(Role::Assistant.as_str(), "assistant");
    }
}
