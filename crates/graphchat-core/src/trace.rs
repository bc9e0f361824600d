//! Normalization of the backend's intermediate-step trace.
//!
//! The agent reports observations in several shapes. [`normalize`] turns them
//! into one tagged representation so views never inspect raw JSON.

use graphchat_protocol::RawStep;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Marker the QA chain prepends to generated Cypher.
const CYPHER_MARKER: &str = "cypher\n";

/// One tool invocation with its classified observation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedStep {
    pub tool: String,
    pub input: String,
    pub observation: NormalizedObservation,
}

/// Observation shapes understood by the views.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum NormalizedObservation {
    /// The tool answered with a plain string.
    PlainText(String),
    /// The tool ran a nested QA chain that reported its own query steps.
    NestedQueryResult {
        queries: Vec<SubQuery>,
        result: String,
    },
    /// Anything else, structure preserved.
    OpaqueJson(Value),
}

/// A generated query and/or the graph context it returned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// Normalize a raw trace. Output has the same length and order as the input.
pub fn normalize(raw: &[RawStep]) -> Vec<NormalizedStep> {
    raw.iter()
        .map(|step| NormalizedStep {
            tool: step.action.tool.clone(),
            input: step.action.tool_input.clone(),
            observation: classify(&step.observation),
        })
        .collect()
}

fn classify(observation: &Value) -> NormalizedObservation {
    match observation {
        Value::String(text) => NormalizedObservation::PlainText(text.clone()),
        Value::Object(map) => match map.get("intermediate_steps") {
            Some(Value::Array(sub_steps)) => NormalizedObservation::NestedQueryResult {
                queries: sub_steps.iter().filter_map(sub_query).collect(),
                result: result_text(map),
            },
            _ => NormalizedObservation::OpaqueJson(observation.clone()),
        },
        other => NormalizedObservation::OpaqueJson(other.clone()),
    }
}

fn sub_query(sub_step: &Value) -> Option<SubQuery> {
    let map = sub_step.as_object()?;
    let query = match map.get("query").filter(|value| is_present(value)) {
        None => None,
        Some(Value::String(query)) => Some(strip_cypher_marker(query).to_string()),
        Some(other) => Some(other.to_string()),
    };
    let context = map.get("context").filter(|value| is_present(value)).cloned();
    if query.is_none() && context.is_none() {
        return None;
    }
    Some(SubQuery { query, context })
}

/// Null and empty strings count as absent.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.is_empty(),
        _ => true,
    }
}

fn result_text(map: &Map<String, Value>) -> String {
    match map.get("result") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Remove one leading Cypher marker, leaving any further occurrence intact.
pub fn strip_cypher_marker(query: &str) -> &str {
    query.strip_prefix(CYPHER_MARKER).unwrap_or(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn step(observation: Value) -> RawStep {
        RawStep::new("graph_qa", "question", observation)
    }

    #[test]
    fn empty_trace_normalizes_to_empty() {
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn string_observation_is_plain_text() {
        let steps = normalize(&[step(json!("39"))]);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].tool, "graph_qa");
        assert_eq!(steps[0].input, "question");
        assert_eq!(
            steps[0].observation,
            NormalizedObservation::PlainText("39".to_string())
        );
    }

    #[test]
    fn nested_steps_keep_order_and_strip_marker_once() {
        let observation = json!({
            "query": "Who plays for the Nets?",
            "result": "Kevin Durant and Kyrie Irving.",
            "intermediate_steps": [
                { "query": "cypher\ncypher\nMATCH (p:Player) RETURN p" },
                { "context": [{ "p.name": "Kevin Durant" }] },
                { "note": "ignored" },
                "not an object"
            ]
        });
        let steps = normalize(&[step(observation)]);
        assert_eq!(
            steps[0].observation,
            NormalizedObservation::NestedQueryResult {
                queries: vec![
                    SubQuery {
                        query: Some("cypher\nMATCH (p:Player) RETURN p".to_string()),
                        context: None,
                    },
                    SubQuery {
                        query: None,
                        context: Some(json!([{ "p.name": "Kevin Durant" }])),
                    },
                ],
                result: "Kevin Durant and Kyrie Irving.".to_string(),
            }
        );
    }

    #[test]
    fn empty_query_and_context_count_as_absent() {
        let observation = json!({
            "result": "none",
            "intermediate_steps": [
                { "query": "", "context": "" },
                { "query": "", "context": [] },
                { "query": "MATCH (n) RETURN n", "context": "" }
            ]
        });
        let steps = normalize(&[step(observation)]);
        assert_eq!(
            steps[0].observation,
            NormalizedObservation::NestedQueryResult {
                queries: vec![
                    SubQuery {
                        query: None,
                        context: Some(json!([])),
                    },
                    SubQuery {
                        query: Some("MATCH (n) RETURN n".to_string()),
                        context: None,
                    },
                ],
                result: "none".to_string(),
            }
        );
    }

    #[test]
    fn nested_result_defaults_and_compacts() {
        let missing = normalize(&[step(json!({ "intermediate_steps": [] }))]);
        let structured = normalize(&[step(json!({
            "intermediate_steps": [],
            "result": { "rows": 2 }
        }))]);
        assert_eq!(
            missing[0].observation,
            NormalizedObservation::NestedQueryResult {
                queries: Vec::new(),
                result: String::new(),
            }
        );
        assert_eq!(
            structured[0].observation,
            NormalizedObservation::NestedQueryResult {
                queries: Vec::new(),
                result: r#"{"rows":2}"#.to_string(),
            }
        );
    }

    #[test]
    fn other_shapes_are_opaque_json() {
        let values = [
            json!({ "rows": [1, 2, 3] }),
            json!({ "intermediate_steps": "not a list" }),
            json!(42),
            json!([1, 2]),
            Value::Null,
        ];
        let raw: Vec<RawStep> = values.iter().cloned().map(step).collect();
        let steps = normalize(&raw);
        assert_eq!(steps.len(), values.len());
        for (normalized, value) in steps.iter().zip(values) {
            assert_eq!(normalized.observation, NormalizedObservation::OpaqueJson(value));
        }
    }

    #[test]
    fn marker_is_only_stripped_at_the_start() {
        assert_eq!(strip_cypher_marker("MATCH (n) RETURN n"), "MATCH (n) RETURN n");
        assert_eq!(strip_cypher_marker("x cypher\nMATCH"), "x cypher\nMATCH");
        assert_eq!(strip_cypher_marker("cypher\n"), "");
    }
}
