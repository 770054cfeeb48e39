//! OpenAI-Compatible Provider
//!
//! Chat-completions client for OpenAI-protocol endpoints. The gateway ships
//! pointed at a hosted llama endpoint; the base URL override covers any
//! compatible deployment.

use async_trait::async_trait;
use serde::Deserialize;

use super::provider::{missing_api_key_error, parse_http_error, LlmProvider};
use super::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, MessageContent, MessageRole,
    ProviderConfig, StopReason, ToolCall, ToolCallMode, ToolDefinition, UsageStats,
};

/// Default OpenAI API endpoint.
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiCompatProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(OPENAI_API_URL)
    }

    /// Build the request body for the API.
    fn build_request_body(
        &self,
        messages: &[Message],
        system: Option<&str>,
        tools: &[ToolDefinition],
        options: &LlmRequestOptions,
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": options.max_tokens_override.unwrap_or(self.config.max_tokens),
            "temperature": options.temperature_override.unwrap_or(self.config.temperature),
        });

        let mut wire_messages: Vec<serde_json::Value> = Vec::new();
        if let Some(sys) = system {
            wire_messages.push(serde_json::json!({
                "role": "system",
                "content": sys
            }));
        }
        for msg in messages {
            wire_messages.extend(message_to_wire(msg));
        }
        body["messages"] = serde_json::json!(wire_messages);

        if !tools.is_empty() && options.tool_call_mode != ToolCallMode::None {
            let wire_tools: Vec<serde_json::Value> = tools.iter().map(tool_to_wire).collect();
            body["tools"] = serde_json::json!(wire_tools);
            body["tool_choice"] = match options.tool_call_mode {
                ToolCallMode::Required => serde_json::json!("required"),
                _ => serde_json::json!("auto"),
            };
        }

        body
    }

    fn parse_response(&self, response: &WireResponse) -> LlmResponse {
        let choice = response.choices.first();

        let mut content = None;
        let mut tool_calls = Vec::new();
        if let Some(choice) = choice {
            if let Some(msg) = &choice.message {
                content = msg.content.clone().filter(|c| !c.is_empty());
                if let Some(wire_calls) = &msg.tool_calls {
                    for call in wire_calls {
                        let arguments: serde_json::Value =
                            serde_json::from_str(&call.function.arguments)
                                .unwrap_or(serde_json::Value::Null);
                        tool_calls.push(ToolCall {
                            id: call.id.clone(),
                            name: call.function.name.clone(),
                            arguments,
                        });
                    }
                }
            }
        }

        let stop_reason = choice
            .and_then(|c| c.finish_reason.as_deref())
            .map(StopReason::from)
            .unwrap_or(StopReason::EndTurn);

        let usage = response
            .usage
            .as_ref()
            .map(|u| UsageStats {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        LlmResponse {
            content,
            tool_calls,
            stop_reason,
            usage,
            model: response.model.clone(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &'static str {
        "openai-compat"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Vec<ToolDefinition>,
        options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error(self.name()))?;

        let body = self.build_request_body(&messages, system.as_deref(), &tools, &options);

        let response = self
            .client
            .post(self.base_url())
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

        if status != 200 {
            return Err(parse_http_error(status, &body_text, self.name()));
        }

        let wire: WireResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        Ok(self.parse_response(&wire))
    }
}

/// Convert one internal message into its wire messages. Tool results become
/// separate `role: tool` messages in this protocol.
fn message_to_wire(message: &Message) -> Vec<serde_json::Value> {
    let role = match message.role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::System => "system",
    };

    let mut out = Vec::new();
    let mut tool_calls = Vec::new();
    let mut text = String::new();

    for content in &message.content {
        match content {
            MessageContent::Text { text: t } => {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(t);
            }
            MessageContent::ToolUse { id, name, input } => {
                tool_calls.push(serde_json::json!({
                    "id": id,
                    "type": "function",
                    "function": {
                        "name": name,
                        "arguments": input.to_string(),
                    }
                }));
            }
            MessageContent::ToolResult {
                tool_call_id,
                name,
                content,
                ..
            } => {
                out.push(serde_json::json!({
                    "role": "tool",
                    "tool_call_id": tool_call_id,
                    "name": name,
                    "content": content,
                }));
            }
        }
    }

    if !tool_calls.is_empty() {
        let mut msg = serde_json::json!({
            "role": role,
            "tool_calls": tool_calls,
        });
        if !text.is_empty() {
            msg["content"] = serde_json::json!(text);
        }
        out.insert(0, msg);
    } else if !text.is_empty() || out.is_empty() {
        out.insert(
            0,
            serde_json::json!({
                "role": role,
                "content": text,
            }),
        );
    }

    out
}

fn tool_to_wire(tool: &ToolDefinition) -> serde_json::Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.input_schema,
        }
    })
}

/// Chat-completions response format.
#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    model: String,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: Option<WireMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}
