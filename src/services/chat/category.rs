//! Category Selector
//!
//! Phase-1: choose exactly one tool category for the request. Keyword
//! matching settles most utterances without a model round; otherwise a
//! minimal LLM call with a single meta-tool picks from the enumeration, and
//! anything unusable falls back to the first enabled category. Selection
//! never fails the request.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::services::llm::types::{
    LlmRequestOptions, Message, ParameterSchema, ToolCallMode, ToolDefinition,
};
use crate::services::llm::LlmProvider;
use crate::services::tools::ToolCategory;

/// Token cap for the selection round; one enum value plus a clause of
/// reasoning fits comfortably.
const SELECTOR_MAX_TOKENS: u32 = 100;

const SELECTOR_SYSTEM_PROMPT: &str = "Select ONE tool category for the user's request:\n\
- tracker-analytics: sprint, backlog, bug, velocity, workload, and other project metrics\n\
- cache-control: enabling, disabling, refreshing, or inspecting the analytics cache\n\
- tracker-core: listing, reading, creating, or updating issues and projects";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionSource {
    Keyword,
    Model,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySelection {
    pub category: ToolCategory,
    pub source: SelectionSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

fn enabled_categories(enabled: &HashMap<String, bool>) -> Vec<ToolCategory> {
    ToolCategory::all()
        .into_iter()
        .filter(|c| *enabled.get(c.as_str()).unwrap_or(&true))
        .collect()
}

/// The meta-tool whose only permitted action is returning one category.
fn category_selector_tool(categories: &[ToolCategory]) -> ToolDefinition {
    let mut properties = HashMap::new();
    properties.insert(
        "category".to_string(),
        ParameterSchema::string_enum(
            Some("Tool category for the user's request"),
            &categories.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
        ),
    );
    properties.insert(
        "reasoning".to_string(),
        ParameterSchema::string(Some("Brief explanation of the choice")),
    );
    ToolDefinition {
        name: "select_tool_category".to_string(),
        description: "Select which category of tools to use for the user's request".to_string(),
        input_schema: ParameterSchema::object(
            None,
            properties,
            vec!["category".to_string()],
        ),
    }
}

pub async fn select_category(
    llm: &dyn LlmProvider,
    message: &str,
    enabled: &HashMap<String, bool>,
) -> CategorySelection {
    let candidates = enabled_categories(enabled);
    if candidates.is_empty() {
        // Nothing enabled: still never fail the request here.
        return CategorySelection {
            category: ToolCategory::TrackerCore,
            source: SelectionSource::Fallback,
            reasoning: None,
        };
    }

    // Keyword prefilter, in the categories' priority order.
    let lowered = message.to_lowercase();
    for category in &candidates {
        if category.keywords().iter().any(|kw| lowered.contains(kw)) {
            debug!(category = %category, "category selected by keyword");
            return CategorySelection {
                category: *category,
                source: SelectionSource::Keyword,
                reasoning: None,
            };
        }
    }

    // Model round: empty history, one meta-tool, forced tool choice.
    let response = llm
        .send_message(
            vec![Message::user(message)],
            Some(SELECTOR_SYSTEM_PROMPT.to_string()),
            vec![category_selector_tool(&candidates)],
            LlmRequestOptions {
                tool_call_mode: ToolCallMode::Required,
                max_tokens_override: Some(SELECTOR_MAX_TOKENS),
                temperature_override: Some(0.1),
            },
        )
        .await;

    if let Ok(response) = response {
        if let Some(call) = response.tool_calls.first() {
            let chosen = call
                .arguments
                .get("category")
                .and_then(serde_json::Value::as_str)
                .and_then(ToolCategory::parse);
            if let Some(category) = chosen.filter(|c| candidates.contains(c)) {
                debug!(category = %category, "category selected by model");
                return CategorySelection {
                    category,
                    source: SelectionSource::Model,
                    reasoning: call
                        .arguments
                        .get("reasoning")
                        .and_then(serde_json::Value::as_str)
                        .map(|s| s.to_string()),
                };
            }
        }
    }

    // Invalid or missing choice: first enabled category wins.
    debug!(category = %candidates[0], "category selected by fallback");
    CategorySelection {
        category: candidates[0],
        source: SelectionSource::Fallback,
        reasoning: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm::types::{LlmError, LlmResponse, LlmResult, StopReason, ToolCall, UsageStats};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted provider: pops pre-baked responses.
    struct Scripted {
        responses: Mutex<Vec<LlmResult<LlmResponse>>>,
    }

    impl Scripted {
        fn new(responses: Vec<LlmResult<LlmResponse>>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }

        fn selecting(category: &str) -> Self {
            Self::new(vec![Ok(LlmResponse {
                content: None,
                tool_calls: vec![ToolCall {
                    id: "call_1".to_string(),
                    name: "select_tool_category".to_string(),
                    arguments: serde_json::json!({"category": category, "reasoning": "fits"}),
                }],
                stop_reason: StopReason::ToolUse,
                usage: UsageStats::default(),
                model: "scripted".to_string(),
            })])
        }
    }

    #[async_trait]
    impl LlmProvider for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted"
        }

        async fn send_message(
            &self,
            _messages: Vec<Message>,
            _system: Option<String>,
            _tools: Vec<ToolDefinition>,
            _options: LlmRequestOptions,
        ) -> LlmResult<LlmResponse> {
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| {
                    Err(LlmError::NetworkError {
                        message: "script exhausted".to_string(),
                    })
                })
        }
    }

    fn all_enabled() -> HashMap<String, bool> {
        HashMap::new()
    }

    #[tokio::test]
    async fn test_keyword_match_skips_model() {
        // Provider would fail; the keyword path must not call it.
        let llm = Scripted::new(vec![]);
        let selection = select_category(&llm, "what is our sprint velocity?", &all_enabled()).await;
        assert_eq!(selection.category, ToolCategory::TrackerAnalytics);
        assert_eq!(selection.source, SelectionSource::Keyword);
    }

    #[tokio::test]
    async fn test_cache_keyword() {
        let llm = Scripted::new(vec![]);
        let selection = select_category(&llm, "refresh the cache please", &all_enabled()).await;
        assert_eq!(selection.category, ToolCategory::CacheControl);
    }

    #[tokio::test]
    async fn test_model_round_on_no_keywords() {
        let llm = Scripted::selecting("tracker-core");
        let selection = select_category(&llm, "what is happening over there", &all_enabled()).await;
        assert_eq!(selection.category, ToolCategory::TrackerCore);
        assert_eq!(selection.source, SelectionSource::Model);
        assert_eq!(selection.reasoning.as_deref(), Some("fits"));
    }

    #[tokio::test]
    async fn test_invalid_model_choice_falls_back() {
        let llm = Scripted::selecting("music");
        let selection = select_category(&llm, "hmm", &all_enabled()).await;
        assert_eq!(selection.source, SelectionSource::Fallback);
        assert_eq!(selection.category, ToolCategory::TrackerAnalytics);
    }

    #[tokio::test]
    async fn test_provider_error_falls_back() {
        let llm = Scripted::new(vec![Err(LlmError::NetworkError {
            message: "down".to_string(),
        })]);
        let selection = select_category(&llm, "hmm", &all_enabled()).await;
        assert_eq!(selection.source, SelectionSource::Fallback);
    }

    #[tokio::test]
    async fn test_disabled_category_not_selected() {
        let llm = Scripted::new(vec![]);
        let enabled = HashMap::from([("tracker-analytics".to_string(), false)]);
        let selection = select_category(&llm, "sprint status please", &enabled).await;
        // Analytics is disabled; "sprint" must not select it.
        assert_ne!(selection.category, ToolCategory::TrackerAnalytics);
    }

    #[tokio::test]
    async fn test_model_choice_outside_enabled_set_falls_back() {
        let llm = Scripted::selecting("tracker-analytics");
        let enabled = HashMap::from([("tracker-analytics".to_string(), false)]);
        let selection = select_category(&llm, "hmm", &enabled).await;
        assert_eq!(selection.source, SelectionSource::Fallback);
        assert_ne!(selection.category, ToolCategory::TrackerAnalytics);
    }

    #[test]
    fn test_selector_tool_enumerates_candidates() {
        let tool = category_selector_tool(&[ToolCategory::TrackerCore, ToolCategory::CacheControl]);
        let json = serde_json::to_value(&tool).unwrap();
        assert_eq!(json["name"], "select_tool_category");
        let enum_values = &json["input_schema"]["properties"]["category"]["enum"];
        assert_eq!(enum_values[0], "tracker-core");
        assert_eq!(enum_values[1], "cache-control");
    }
}
