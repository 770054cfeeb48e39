//! Tool-Loop Runtime
//!
//! Phase-2: drive the model against the category's tool subset with hard
//! caps, feed tool results back as tool-role messages, and assemble the
//! final reply. Tool failures become tool messages the model can recover
//! from; only provider failures that survive the retry budget abort the
//! request.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::services::llm::types::{
    LlmRequestOptions, Message, MessageRole, ToolCallMode,
};
use crate::services::llm::LlmProvider;
use crate::services::tools::{ToolCategory, ToolContext, ToolRegistry};
use crate::utils::error::{AppError, AppResult};

use super::{select_category, HistoryEntry};

/// Loop caps.
const MAX_ITERATIONS: usize = 3;
const MAX_TOOLS_PER_ITERATION: usize = 2;

/// Provider retry budget inside one request.
const LLM_MAX_RETRIES: u32 = 2;
const LLM_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Tool results above this size are compacted before re-entering the model.
const TOOL_RESULT_COMPACT_THRESHOLD: usize = 3000;
/// List payloads keep this many leading entries when compacted.
const COMPACT_LIST_KEEP: usize = 5;
/// Assistant texts stored into the returned history are summarized past this.
const HISTORY_SUMMARY_CHARS: usize = 500;

/// Assembled reply plus the trimmed history handed back to the client.
#[derive(Debug)]
pub struct ChatOutcome {
    pub response: String,
    pub history: Vec<HistoryEntry>,
}

/// Run one chat request through category selection and the bounded loop.
pub async fn run_chat(
    config: &GatewayConfig,
    llm: &dyn LlmProvider,
    registry: &ToolRegistry,
    tool_ctx: &ToolContext,
    message: &str,
    history: &[HistoryEntry],
    enabled: &HashMap<String, bool>,
) -> AppResult<ChatOutcome> {
    let deadline = Instant::now() + Duration::from_secs(config.request_timeout_secs);
    let reserve = Duration::from_secs(config.deadline_reserve_secs);

    let selection = select_category(llm, message, enabled).await;
    info!(
        category = %selection.category,
        source = ?selection.source,
        "category selected"
    );

    let tools = registry.definitions_for_category(selection.category, enabled);
    let system_prompt = build_system_prompt(selection.category, &tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>());

    let mut messages: Vec<Message> = Vec::new();
    let tail = history.len().saturating_sub(config.history_window);
    for entry in &history[tail..] {
        if let Some(msg) = history_to_message(entry) {
            messages.push(msg);
        }
    }
    messages.push(Message::user(message));

    // JSON payloads of successful analytic tool calls, appended verbatim to
    // the reply so the renderer never depends on the model quoting them.
    let mut analytic_payloads: Vec<Value> = Vec::new();
    let mut final_text: Option<String> = None;

    for iteration in 0..MAX_ITERATIONS {
        if tool_ctx.cancellation_token.is_cancelled() {
            return Err(AppError::DeadlineExceeded("request cancelled".to_string()));
        }
        if Instant::now() + reserve >= deadline {
            warn!(iteration, "deadline budget exhausted before iteration");
            final_text = Some(
                "The request ran out of time before an answer could be assembled. \
                 Try a narrower question."
                    .to_string(),
            );
            break;
        }

        let response = call_with_retry(llm, &messages, &system_prompt, &tools, tool_ctx).await?;

        if !response.has_tool_calls() {
            final_text = Some(
                response
                    .content
                    .unwrap_or_else(|| "I was unable to generate a response.".to_string()),
            );
            break;
        }

        // Cap the number of dispatched calls; the rest are dropped and the
        // model sees only what actually ran.
        let executed: Vec<_> = response
            .tool_calls
            .iter()
            .take(MAX_TOOLS_PER_ITERATION)
            .cloned()
            .collect();
        if response.tool_calls.len() > executed.len() {
            debug!(
                requested = response.tool_calls.len(),
                executed = executed.len(),
                "tool calls over the per-iteration cap were dropped"
            );
        }

        messages.push(Message::assistant_tool_calls(
            response.content.clone(),
            &executed,
        ));

        for call in &executed {
            info!(tool = %call.name, iteration, "dispatching tool call");
            let result = registry
                .execute(&call.name, tool_ctx, call.arguments.clone())
                .await;

            if result.success && is_analytic_tool(registry, &call.name) {
                analytic_payloads.push(result.payload.clone());
            }

            let content = compact_tool_content(&result.payload);
            messages.push(Message::tool_result(
                &call.id,
                &call.name,
                content,
                !result.success,
            ));
        }

        if iteration + 1 == MAX_ITERATIONS {
            // Cap reached: one last round, no tools allowed.
            messages.push(Message::text(
                MessageRole::System,
                "Tool budget exhausted. Based on the tool results above, provide the final \
                 answer now. Do not request more tools.",
            ));
            let forced = llm
                .send_message(
                    messages.clone(),
                    Some(system_prompt.clone()),
                    Vec::new(),
                    LlmRequestOptions {
                        tool_call_mode: ToolCallMode::None,
                        ..Default::default()
                    },
                )
                .await?;
            final_text = Some(
                forced
                    .content
                    .unwrap_or_else(|| "I was unable to generate a response.".to_string()),
            );
        }
    }

    let mut response_text =
        final_text.unwrap_or_else(|| "I was unable to generate a response.".to_string());
    for payload in &analytic_payloads {
        if let Ok(block) = serde_json::to_string_pretty(payload) {
            response_text.push_str("\n\n");
            response_text.push_str(&block);
        }
    }

    let history = assemble_history(config, history, message, &response_text);
    Ok(ChatOutcome {
        response: response_text,
        history,
    })
}

/// System prompt for the tool round, instructing single-call preference and
/// verbatim surfacing of analytic JSON.
fn build_system_prompt(category: ToolCategory, tool_names: &[&str]) -> String {
    format!(
        "You are a project-management assistant with {} tools.\n\n\
         INSTRUCTIONS:\n\
         1. Prefer a single tool call; tool results are authoritative.\n\
         2. When the user asks for multiple analytics, call each tool once.\n\
         3. After getting results, answer clearly with the numbers from the results.\n\
         4. For analytic results, repeat the JSON payload verbatim so it can be rendered.\n\
         5. If a tool reports an error, explain it briefly; do not invent data.\n\n\
         Available tools: {}",
        category,
        tool_names.join(", ")
    )
}

async fn call_with_retry(
    llm: &dyn LlmProvider,
    messages: &[Message],
    system_prompt: &str,
    tools: &[crate::services::llm::types::ToolDefinition],
    tool_ctx: &ToolContext,
) -> AppResult<crate::services::llm::LlmResponse> {
    let mut attempt = 0u32;
    loop {
        let result = llm
            .send_message(
                messages.to_vec(),
                Some(system_prompt.to_string()),
                tools.to_vec(),
                LlmRequestOptions::default(),
            )
            .await;
        match result {
            Ok(response) => return Ok(response),
            Err(err) if err.is_retryable() && attempt < LLM_MAX_RETRIES => {
                let delay = err
                    .retry_after_secs()
                    .map(Duration::from_secs)
                    .unwrap_or(LLM_RETRY_DELAY * (attempt + 1));
                warn!(error = %err, attempt, "retrying LLM call");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = tool_ctx.cancellation_token.cancelled() => {
                        return Err(AppError::DeadlineExceeded("request cancelled".to_string()));
                    }
                }
                attempt += 1;
            }
            Err(err) => return Err(AppError::from(err)),
        }
    }
}

fn is_analytic_tool(registry: &ToolRegistry, name: &str) -> bool {
    registry
        .get(name)
        .map(|tool| tool.category() == ToolCategory::TrackerAnalytics)
        .unwrap_or(false)
}

fn history_to_message(entry: &HistoryEntry) -> Option<Message> {
    match entry.role.as_str() {
        "user" => Some(Message::user(&entry.content)),
        "assistant" => Some(Message::assistant(&entry.content)),
        "tool" => Some(Message::tool_result(
            entry.tool_call_id.clone().unwrap_or_default(),
            entry.name.clone().unwrap_or_default(),
            &entry.content,
            false,
        )),
        _ => None,
    }
}

/// Compact an oversized tool payload before it re-enters the model: list
/// payloads keep their first entries, anything else is truncated.
fn compact_tool_content(payload: &Value) -> String {
    let full = serde_json::to_string_pretty(payload).unwrap_or_else(|_| "{}".to_string());
    if full.len() <= TOOL_RESULT_COMPACT_THRESHOLD {
        return full;
    }

    let mut compacted = payload.clone();
    let mut trimmed_list = false;
    for key in ["issues", "projects", "versions", "releases"] {
        if let Some(list) = compacted.get_mut(key).and_then(Value::as_array_mut) {
            if list.len() > COMPACT_LIST_KEEP {
                let dropped = list.len() - COMPACT_LIST_KEEP;
                list.truncate(COMPACT_LIST_KEEP);
                compacted["note"] = Value::String(format!(
                    "showing first {} entries; {} more omitted",
                    COMPACT_LIST_KEEP, dropped
                ));
                trimmed_list = true;
            }
        }
    }
    if trimmed_list {
        return serde_json::to_string_pretty(&compacted).unwrap_or(full);
    }

    let mut cut = TOOL_RESULT_COMPACT_THRESHOLD;
    while cut > 0 && !full.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}\n... [truncated]", &full[..cut])
}

/// New history: incoming tail + this exchange, long assistant texts
/// summarized so histories do not balloon across turns.
fn assemble_history(
    config: &GatewayConfig,
    history: &[HistoryEntry],
    message: &str,
    response: &str,
) -> Vec<HistoryEntry> {
    let summary = if response.len() > HISTORY_SUMMARY_CHARS {
        let mut cut = HISTORY_SUMMARY_CHARS;
        while cut > 0 && !response.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... [summarized]", &response[..cut])
    } else {
        response.to_string()
    };

    let mut all: Vec<HistoryEntry> = history.to_vec();
    all.push(HistoryEntry::user(message));
    all.push(HistoryEntry::assistant(summary));
    let tail = all.len().saturating_sub(config.history_window);
    all.split_off(tail)
}
