//! Intermediate step payloads reported by the backend agent.
//!
//! Decoding is lenient: every JSON element becomes a [`RawStep`]. Agents
//! serialize steps either as `{action, observation}` objects or as
//! `[action, observation]` pairs, and a step's `tool_input` may be a string or
//! a structured value.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tool invocation recorded by the agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "Value")]
pub struct RawAction {
    /// Tool name.
    pub tool: String,
    /// Input passed to the tool, as text.
    pub tool_input: String,
    /// Free-text reasoning log emitted with the call.
    pub log: String,
}

/// One element of the backend's `intermediate_steps` list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "Value")]
pub struct RawStep {
    /// Tool invocation.
    pub action: RawAction,
    /// Observation returned by the tool; its shape is not fixed.
    pub observation: Value,
}

impl RawStep {
    /// Build a step from its parts.
    pub fn new(tool: impl Into<String>, tool_input: impl Into<String>, observation: Value) -> Self {
        Self {
            action: RawAction {
                tool: tool.into(),
                tool_input: tool_input.into(),
                log: String::new(),
            },
            observation,
        }
    }
}

impl From<Value> for RawStep {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(mut map) => Self {
                action: map.remove("action").map(RawAction::from).unwrap_or_default(),
                observation: map.remove("observation").unwrap_or(Value::Null),
            },
            Value::Array(items) => {
                let mut items = items.into_iter();
                Self {
                    action: items.next().map(RawAction::from).unwrap_or_default(),
                    observation: items.next().unwrap_or(Value::Null),
                }
            }
            other => Self {
                action: RawAction::default(),
                observation: other,
            },
        }
    }
}

impl From<Value> for RawAction {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self {
                tool: text_field(&map, "tool"),
                tool_input: text_field(&map, "tool_input"),
                log: text_field(&map, "log"),
            },
            _ => Self::default(),
        }
    }
}

fn text_field(map: &Map<String, Value>, key: &str) -> String {
    match map.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn decodes_object_steps() {
        let step: RawStep = serde_json::from_value(json!({
            "action": { "tool": "graph_qa", "tool_input": "LeBron age", "log": "thinking" },
            "observation": "39"
        }))
        .expect("decode");
        assert_eq!(step.action.tool, "graph_qa");
        assert_eq!(step.action.tool_input, "LeBron age");
        assert_eq!(step.action.log, "thinking");
        assert_eq!(step.observation, json!("39"));
    }

    #[test]
    fn decodes_pair_steps() {
        let step: RawStep = serde_json::from_value(json!([
            { "tool": "search", "tool_input": { "q": "Nets" } },
            { "rows": 3 }
        ]))
        .expect("decode");
        assert_eq!(step.action.tool, "search");
        assert_eq!(step.action.tool_input, r#"{"q":"Nets"}"#);
        assert_eq!(step.observation, json!({ "rows": 3 }));
    }

    #[test]
    fn scalar_steps_keep_value_as_observation() {
        let steps: Vec<RawStep> =
            serde_json::from_value(json!([42, null, "bare"])).expect("decode");
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].action, RawAction::default());
        assert_eq!(steps[0].observation, json!(42));
        assert_eq!(steps[1].observation, Value::Null);
        assert_eq!(steps[2].observation, json!("bare"));
    }

    #[test]
    fn missing_action_fields_default_to_empty() {
        let step: RawStep =
            serde_json::from_value(json!({ "action": { "tool": "qa" } })).expect("decode");
        assert_eq!(step.action.tool_input, "");
        assert_eq!(step.action.log, "");
        assert_eq!(step.observation, Value::Null);
    }
}
