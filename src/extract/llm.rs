//! Model-backed structured extraction

use std::future::Future;
use std::sync::Arc;

use rig::{
    agent::{Agent, AgentBuilder},
    completion::{AssistantContent, Completion as _, CompletionModel},
};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::candidate::ExtractedRecord;
use super::error::ExtractError;

const EXTRACTION_PREAMBLE: &str = "You extract structured calendar data from web pages. \
Respond with JSON only, never with markdown or commentary.";

/// Turns a prompt into structured records.
///
/// The pipeline depends only on this trait, so tests can substitute a
/// deterministic implementation for the model.
pub trait StructuredExtractor: Send + Sync {
    /// Run one extraction request
    fn extract(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<Vec<ExtractedRecord>, ExtractError>> + Send;
}

impl<T: StructuredExtractor> StructuredExtractor for Arc<T> {
    fn extract(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<Vec<ExtractedRecord>, ExtractError>> + Send {
        (**self).extract(prompt)
    }
}

/// Stand-in extractor type for pipelines that only use heuristics
#[derive(Debug, Clone, Copy)]
pub enum NoExtractor {}

impl StructuredExtractor for NoExtractor {
    fn extract(
        &self,
        _prompt: &str,
    ) -> impl Future<Output = Result<Vec<ExtractedRecord>, ExtractError>> + Send {
        let never = *self;
        async move { match never {} }
    }
}

/// Structured extractor over any rig completion model
pub struct LlmExtractor<M: CompletionModel> {
    agent: Arc<Agent<M>>,
}

impl<M: CompletionModel> Clone for LlmExtractor<M> {
    fn clone(&self) -> Self {
        Self {
            agent: Arc::clone(&self.agent),
        }
    }
}

impl<M> LlmExtractor<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    /// Build an extractor with the default preamble and a low temperature
    pub fn new(model: M) -> Self {
        let agent = AgentBuilder::new(model)
            .preamble(EXTRACTION_PREAMBLE)
            .temperature(0.1)
            .build();
        Self::from_agent(agent)
    }

    /// Use a pre-configured agent
    pub fn from_agent(agent: Agent<M>) -> Self {
        Self {
            agent: Arc::new(agent),
        }
    }

    #[instrument(name = "llm_extract", skip_all, fields(prompt_len = prompt.len()))]
    async fn complete(&self, prompt: &str) -> Result<Vec<ExtractedRecord>, ExtractError> {
        debug!("Sending extraction request");
        let response = self.agent.completion(prompt, Vec::new()).await?.send().await?;

        let text = response
            .choice
            .iter()
            .filter_map(|c| match c {
                AssistantContent::Text(text) => Some(text.text.clone()),
                _ => {
                    warn!(content = ?c, "Ignoring non-text extraction response");
                    None
                }
            })
            .collect::<Vec<String>>()
            .join("\n");

        let records = parse_records(&text)?;
        debug!(records = records.len(), "Parsed extraction response");
        Ok(records)
    }
}

impl<M> StructuredExtractor for LlmExtractor<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    fn extract(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<Vec<ExtractedRecord>, ExtractError>> + Send {
        self.complete(prompt)
    }
}

fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    for fence in ["```json", "```JSON", "```"] {
        if let Some(rest) = text.strip_prefix(fence) {
            text = rest;
            break;
        }
    }
    text.strip_suffix("```").unwrap_or(text).trim()
}

fn records_from_array(values: Vec<Value>) -> Vec<ExtractedRecord> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<ExtractedRecord>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed record: {}", e);
                None
            }
        })
        .collect()
}

/// Parse a model response into records
///
/// Accepts a bare JSON array, an array wrapped in code fences or surrounding
/// prose, an object holding the array under any key, or a single object.
/// An empty response is an empty list.
pub fn parse_records(raw: &str) -> Result<Vec<ExtractedRecord>, ExtractError> {
    let text = strip_code_fences(raw);
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(e) => {
            let start = text.find('[');
            let end = text.rfind(']');
            match (start, end) {
                (Some(start), Some(end)) if start < end => {
                    serde_json::from_str::<Value>(&text[start..=end])
                        .map_err(|_| ExtractError::Malformed(e.to_string()))?
                }
                _ => return Err(ExtractError::Malformed(e.to_string())),
            }
        }
    };

    match value {
        Value::Array(values) => Ok(records_from_array(values)),
        Value::Object(map) => {
            let nested = map
                .values()
                .find_map(|v| v.as_array().filter(|a| a.iter().all(Value::is_object)));
            match nested {
                Some(values) if !map.contains_key("title") => {
                    Ok(records_from_array(values.clone()))
                }
                _ => Ok(records_from_array(vec![Value::Object(map)])),
            }
        }
        Value::Null => Ok(Vec::new()),
        other => Err(ExtractError::Malformed(format!(
            "expected a JSON array, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock_model::MockCompletionModel;

    #[test]
    fn test_parse_bare_array() {
        let records = parse_records(
            r#"[{"title": "Jazz Night", "date": "2026-03-15", "time": "19:30"}, {"title": "Art Walk"}]"#,
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title.as_deref(), Some("Jazz Night"));
        assert_eq!(records[0].time.as_deref(), Some("19:30"));
        assert_eq!(records[1].date, None);
    }

    #[test]
    fn test_parse_fenced_and_wrapped_responses() {
        let fenced = "```json\n[{\"title\": \"Pottery\"}]\n```";
        assert_eq!(parse_records(fenced).unwrap().len(), 1);

        let wrapped = r#"{"events": [{"title": "A"}, {"title": "B"}]}"#;
        assert_eq!(parse_records(wrapped).unwrap().len(), 2);

        let single = r#"{"title": "Board Meeting", "dates": ["2026-03-01"], "recurrence": "first monday"}"#;
        let records = parse_records(single).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].recurring_pattern.as_deref(), Some("first monday"));

        let prose = "Here are the events:\n[{\"title\": \"Parade\"}]\nLet me know!";
        assert_eq!(parse_records(prose).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_malformed_and_empty() {
        assert!(parse_records("").unwrap().is_empty());
        assert!(parse_records("[]").unwrap().is_empty());
        assert!(matches!(
            parse_records("I could not find any events."),
            Err(ExtractError::Malformed(_))
        ));
        assert!(matches!(
            parse_records("I could not find events [see the page] sorry."),
            Err(ExtractError::Malformed(_))
        ));
        // A bad element is skipped, the rest survive
        let records = parse_records(r#"[{"title": 5}, {"title": "Fair"}]"#).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_llm_extractor_with_mock_model() {
        let model = MockCompletionModel::new();
        model
            .set_text_response("```json\n[{\"title\": \"Spring Festival\", \"date\": \"2026-04-18\"}]\n```")
            .await;
        let extractor = LlmExtractor::new(model.clone());

        let records = extractor.extract("extract events").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date.as_deref(), Some("2026-04-18"));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_llm_extractor_surfaces_completion_errors() {
        let model = MockCompletionModel::new();
        model.set_error("quota exceeded").await;
        let extractor = LlmExtractor::new(model);

        let result = extractor.extract("extract events").await;
        assert!(matches!(result, Err(ExtractError::Completion(_))));
    }
}
