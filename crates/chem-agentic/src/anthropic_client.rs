//! Anthropic Client
//!
//! LLM client implementation for the Anthropic messages API.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::llm_client::{
    log_preview, ChatMessage, ChatRole, CompletionRequest, LlmClient, ToolCallResult,
    ToolDefinition, LOG_PREVIEW_CHARS,
};

/// Default Anthropic model
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

const API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Token budget for function-calling turns
const TOOL_MAX_TOKENS: u32 = 1024;

/// Anthropic API client
#[derive(Clone)]
pub struct AnthropicClient {
    api_key: String,
    client: reqwest::Client,
    model: String,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
    name: Option<String>,
    input: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
}

impl AnthropicClient {
    /// Create a new Anthropic client with the given API key
    pub fn new(api_key: String) -> Self {
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self {
            api_key,
            client: reqwest::Client::new(),
            model,
        }
    }

    /// Create with a specific model
    pub fn with_model(api_key: String, model: &str) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            model: model.to_string(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| anyhow!("ANTHROPIC_API_KEY environment variable not set"))?;
        Ok(Self::new(api_key))
    }

    async fn post(&self, body: &serde_json::Value) -> Result<String> {
        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Anthropic API error {}: {}", status, body));
        }

        Ok(response.text().await?)
    }

    fn completion_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": &self.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": [{"role": "user", "content": &request.prompt}]
        });
        if let Some(stop) = &request.stop {
            body["stop_sequences"] = serde_json::json!(stop);
        }
        body
    }

    /// System messages go to the top-level `system` field; few-shot function
    /// calls are replayed as plain assistant text.
    fn function_body(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        forced: &str,
    ) -> serde_json::Value {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .collect();

        let turns: Vec<serde_json::Value> = messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| {
                let role = if m.role == ChatRole::Assistant {
                    "assistant"
                } else {
                    "user"
                };
                let content = match &m.function_call {
                    Some(call) => format!("{}({})", call.tool_name, call.arguments),
                    None => m.content.clone(),
                };
                serde_json::json!({"role": role, "content": content})
            })
            .collect();

        let tools: Vec<serde_json::Value> = tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": &t.name,
                    "description": &t.description,
                    "input_schema": &t.parameters
                })
            })
            .collect();

        serde_json::json!({
            "model": &self.model,
            "max_tokens": TOOL_MAX_TOKENS,
            "system": system.join("\n\n"),
            "messages": turns,
            "tools": tools,
            "tool_choice": {"type": "tool", "name": forced}
        })
    }

    fn parse_tool_use(response_text: &str) -> Result<ToolCallResult> {
        let api_response: ApiResponse = serde_json::from_str(response_text)
            .map_err(|e| anyhow!("Failed to parse Anthropic response: {}", e))?;

        let block = api_response
            .content
            .into_iter()
            .find(|b| b.kind == "tool_use")
            .ok_or_else(|| anyhow!("No tool_use block in Anthropic response"))?;

        Ok(ToolCallResult {
            tool_name: block.name.unwrap_or_default(),
            arguments: block.input.unwrap_or(serde_json::Value::Null),
            raw: response_text.to_string(),
        })
    }

    fn parse_text(response_text: &str) -> Result<String> {
        let api_response: ApiResponse = serde_json::from_str(response_text)
            .map_err(|e| anyhow!("Failed to parse Anthropic response: {}", e))?;
        api_response
            .content
            .into_iter()
            .find_map(|c| c.text)
            .ok_or_else(|| anyhow!("Empty response from Anthropic"))
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let response_text = self.post(&self.completion_body(request)).await?;
        Self::parse_text(&response_text)
    }

    async fn call_function(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        forced: &str,
    ) -> Result<ToolCallResult> {
        let response_text = self
            .post(&self.function_body(messages, tools, forced))
            .await?;
        tracing::debug!(
            "Anthropic raw response: {}",
            log_preview(&response_text, LOG_PREVIEW_CHARS)
        );
        Self::parse_tool_use(&response_text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "Anthropic"
    }
}
