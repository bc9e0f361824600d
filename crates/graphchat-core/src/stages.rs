//! Stage view built from a normalized trace.

use crate::trace::{NormalizedObservation, NormalizedStep};
use serde_json::Value;

/// Title suffix of the synthetic closing stage.
pub const FINAL_STAGE_LABEL: &str = "Formulating Response from Agentic Trace";

/// One displayable unit of a trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// 1-based position in the stage list.
    pub index: usize,
    pub title: String,
    pub tool_input: String,
    pub observation: ObservationView,
}

/// Display-ready observation body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservationView {
    Text(String),
    Queries {
        queries: Vec<QueryView>,
        result: String,
    },
    Json(String),
}

/// A cleaned query and its pretty-printed context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryView {
    pub query: Option<String>,
    pub context: Option<String>,
}

/// Build the stage list for a traced answer.
///
/// One stage per step, plus a closing stage carrying `final_answer` when the
/// trace has more than one step.
pub fn to_stages(trace: &[NormalizedStep], final_answer: &str) -> Vec<Stage> {
    let mut stages: Vec<Stage> = trace
        .iter()
        .enumerate()
        .map(|(offset, step)| {
            let index = offset + 1;
            Stage {
                index,
                title: format!("Step {index}: Using Tool `{}`", step.tool),
                tool_input: step.input.clone(),
                observation: view(&step.observation),
            }
        })
        .collect();
    if trace.len() > 1 {
        let index = trace.len() + 1;
        stages.push(Stage {
            index,
            title: format!("Step {index}: {FINAL_STAGE_LABEL}"),
            tool_input: String::new(),
            observation: ObservationView::Text(final_answer.to_string()),
        });
    }
    stages
}

fn view(observation: &NormalizedObservation) -> ObservationView {
    match observation {
        NormalizedObservation::PlainText(text) => ObservationView::Text(text.clone()),
        NormalizedObservation::NestedQueryResult { queries, result } => ObservationView::Queries {
            queries: queries
                .iter()
                .map(|sub| QueryView {
                    query: sub.query.clone(),
                    context: sub.context.as_ref().map(pretty_json),
                })
                .collect(),
            result: result.clone(),
        },
        NormalizedObservation::OpaqueJson(value) => ObservationView::Json(pretty_json(value)),
    }
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::SubQuery;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn plain(tool: &str, text: &str) -> NormalizedStep {
        NormalizedStep {
            tool: tool.to_string(),
            input: format!("{tool} input"),
            observation: NormalizedObservation::PlainText(text.to_string()),
        }
    }

    #[test]
    fn no_final_stage_for_zero_or_one_step() {
        assert!(to_stages(&[], "answer").is_empty());
        let stages = to_stages(&[plain("graph_qa", "39")], "39");
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].title, "Step 1: Using Tool `graph_qa`");
        assert_eq!(stages[0].tool_input, "graph_qa input");
        assert_eq!(stages[0].observation, ObservationView::Text("39".to_string()));
    }

    #[test]
    fn final_stage_follows_multiple_steps() {
        let trace = [plain("graph_qa", "a"), plain("calculator", "b")];
        let stages = to_stages(&trace, "Luka is 14 years younger.");
        assert_eq!(stages.len(), 3);
        assert_eq!(
            stages.iter().map(|stage| stage.index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(stages[1].title, "Step 2: Using Tool `calculator`");
        assert_eq!(
            stages[2],
            Stage {
                index: 3,
                title: "Step 3: Formulating Response from Agentic Trace".to_string(),
                tool_input: String::new(),
                observation: ObservationView::Text("Luka is 14 years younger.".to_string()),
            }
        );
    }

    #[test]
    fn nested_and_opaque_observations_render_as_json_text() {
        let trace = [
            NormalizedStep {
                tool: "graph_qa".to_string(),
                input: "nets roster".to_string(),
                observation: NormalizedObservation::NestedQueryResult {
                    queries: vec![SubQuery {
                        query: Some("MATCH (p) RETURN p".to_string()),
                        context: Some(json!({ "name": "Kevin Durant" })),
                    }],
                    result: "Kevin Durant".to_string(),
                },
            },
            NormalizedStep {
                tool: "lookup".to_string(),
                input: String::new(),
                observation: NormalizedObservation::OpaqueJson(json!({ "rows": 1 })),
            },
        ];
        let stages = to_stages(&trace, "done");
        assert_eq!(
            stages[0].observation,
            ObservationView::Queries {
                queries: vec![QueryView {
                    query: Some("MATCH (p) RETURN p".to_string()),
                    context: Some("{\n  \"name\": \"Kevin Durant\"\n}".to_string()),
                }],
                result: "Kevin Durant".to_string(),
            }
        );
        assert_eq!(
            stages[1].observation,
            ObservationView::Json("{\n  \"rows\": 1\n}".to_string())
        );
    }
}
