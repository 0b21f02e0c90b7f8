//! OpenAI Client
//!
//! LLM client implementation for the OpenAI chat completions API.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::llm_client::{
    log_preview, ChatMessage, ChatRole, CompletionRequest, LlmClient, ToolCallResult,
    ToolDefinition, LOG_PREVIEW_CHARS,
};

/// Default OpenAI model
const DEFAULT_MODEL: &str = "gpt-4o";

const API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI API client
#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    client: reqwest::Client,
    model: String,
}

impl OpenAiClient {
    /// Create a new OpenAI client with the given API key
    pub fn new(api_key: String) -> Self {
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
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
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self::new(api_key))
    }

    async fn post(&self, body: &serde_json::Value) -> Result<String> {
        let response = self
            .client
            .post(API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("OpenAI API error {}: {}", status, body));
        }

        Ok(response.text().await?)
    }

    /// Message in OpenAI wire format
    fn wire_message(message: &ChatMessage) -> serde_json::Value {
        let role = match message.role {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        };
        match &message.function_call {
            Some(call) => serde_json::json!({
                "role": role,
                "content": &message.content,
                "function_call": {
                    "name": &call.tool_name,
                    "arguments": call.arguments.to_string(),
                }
            }),
            None => serde_json::json!({"role": role, "content": &message.content}),
        }
    }

    fn completion_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": &self.model,
            "messages": [{"role": "user", "content": &request.prompt}],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });
        if let Some(stop) = &request.stop {
            body["stop"] = serde_json::json!(stop);
        }
        body
    }

    fn function_body(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        forced: &str,
    ) -> serde_json::Value {
        let functions: Vec<serde_json::Value> = tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": &t.name,
                    "description": &t.description,
                    "parameters": &t.parameters
                })
            })
            .collect();

        serde_json::json!({
            "model": &self.model,
            "messages": messages.iter().map(Self::wire_message).collect::<Vec<_>>(),
            "functions": functions,
            "function_call": {"name": forced},
            "frequency_penalty": 0,
            "presence_penalty": 0,
        })
    }

    /// Parse a chat completion carrying a function_call
    fn parse_function_call(response_text: &str) -> Result<ToolCallResult> {
        // Response format: { "choices": [{ "message": { "function_call": { "name": "...", "arguments": "..." } } }] }
        #[derive(Deserialize)]
        struct FunctionCall {
            name: String,
            arguments: String, // OpenAI returns arguments as a JSON string
        }
        #[derive(Deserialize)]
        struct Message {
            function_call: Option<FunctionCall>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            choices: Vec<Choice>,
        }

        let api_response: ApiResponse = serde_json::from_str(response_text)
            .map_err(|e| anyhow!("Failed to parse OpenAI response: {}", e))?;

        let function_call = api_response
            .choices
            .first()
            .and_then(|c| c.message.function_call.as_ref())
            .ok_or_else(|| anyhow!("No function_call in OpenAI response"))?;

        tracing::debug!(
            "OpenAI function_call arguments: {}",
            &function_call.arguments
        );

        // Keep the raw string if it is not JSON; the extractor reports it
        let arguments = serde_json::from_str(&function_call.arguments)
            .unwrap_or_else(|_| serde_json::Value::String(function_call.arguments.clone()));

        Ok(ToolCallResult {
            tool_name: function_call.name.clone(),
            arguments,
            raw: response_text.to_string(),
        })
    }

    fn parse_completion(response_text: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct Message {
            content: Option<String>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            choices: Vec<Choice>,
        }

        let api_response: ApiResponse = serde_json::from_str(response_text)
            .map_err(|e| anyhow!("Failed to parse OpenAI response: {}", e))?;
        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("OpenAI returned no choices"))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let response_text = self.post(&self.completion_body(request)).await?;
        Self::parse_completion(&response_text)
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
            "OpenAI raw response: {}",
            log_preview(&response_text, LOG_PREVIEW_CHARS)
        );
        Self::parse_function_call(&response_text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "OpenAI"
    }
}
