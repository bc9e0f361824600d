//! Wire types exchanged with the graph question-answering backend.

mod step;

pub use step::{RawAction, RawStep};

use serde::{Deserialize, Serialize};

/// Default path of the question endpoint on the backend.
pub const DEFAULT_ENDPOINT_PATH: &str = "/api/generate-query";

/// Request body sent to the backend for a single question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionRequest {
    /// Question typed by the user.
    pub question: String,
}

impl QuestionRequest {
    /// Build a request for the given question text.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
        }
    }
}

/// Response body returned by the backend.
///
/// Agent deployments answer with `{output, intermediate_steps}`; older ones
/// answer with a bare `{answer}`. Both decode into this struct and callers
/// pick the text with [`AnswerResponse::answer_text`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnswerResponse {
    /// Final answer produced by the agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Legacy answer field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Tool-use trace, when the agent reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate_steps: Option<Vec<RawStep>>,
    /// Error message reported by the backend instead of an answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnswerResponse {
    /// Build an agent-style response with an answer and a trace.
    pub fn with_output(output: impl Into<String>, steps: Vec<RawStep>) -> Self {
        Self {
            output: Some(output.into()),
            intermediate_steps: Some(steps),
            ..Self::default()
        }
    }

    /// Build a legacy response carrying only `answer`.
    pub fn with_answer(answer: impl Into<String>) -> Self {
        Self {
            answer: Some(answer.into()),
            ..Self::default()
        }
    }

    /// Answer text, preferring `output` and falling back to `answer`.
    pub fn answer_text(&self) -> Option<&str> {
        self.output.as_deref().or(self.answer.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn prefers_output_over_answer() {
        let response: AnswerResponse =
            serde_json::from_value(json!({ "output": "39", "answer": "old" })).expect("decode");
        assert_eq!(response.answer_text(), Some("39"));
    }

    #[test]
    fn falls_back_to_legacy_answer() {
        let response: AnswerResponse =
            serde_json::from_value(json!({ "answer": "Lakers" })).expect("decode");
        assert_eq!(response.answer_text(), Some("Lakers"));
        assert!(response.intermediate_steps.is_none());
    }

    #[test]
    fn missing_answer_fields_decode_to_none() {
        let response: AnswerResponse =
            serde_json::from_value(json!({ "error": "Question not provided" })).expect("decode");
        assert_eq!(response.answer_text(), None);
        assert_eq!(response.error.as_deref(), Some("Question not provided"));
    }

    #[test]
    fn question_request_serializes_single_field() {
        let value = serde_json::to_value(QuestionRequest::new("How old is LeBron James?"))
            .expect("encode");
        assert_eq!(value, json!({ "question": "How old is LeBron James?" }));
    }
}
