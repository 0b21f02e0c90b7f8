//! LLM Client Trait
//!
//! Unified interface for the two model capabilities the pipeline delegates:
//! plain text completion (segmentation) and forced function calling
//! (argument extraction). Providers: Anthropic, OpenAI, and an in-memory
//! scripted client for tests.

use anyhow::Result;
use async_trait::async_trait;
use chem_ops_types::{OperationRegistry, OperationSpec};
use serde::{Deserialize, Serialize};

/// Text completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Stop sequences (none by default)
    pub stop: Option<Vec<String>>,
}

impl CompletionRequest {
    /// Deterministic request: temperature pinned to zero, no stop sequences
    pub fn deterministic(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
            temperature: 0.0,
            stop: None,
        }
    }
}

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One chat message
///
/// Assistant messages may carry a function call, used for few-shot examples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<ToolCallResult>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
            function_call: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            function_call: None,
        }
    }

    /// Assistant turn that answered with a function call
    pub fn assistant_call(call: ToolCallResult) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: String::new(),
            function_call: Some(call),
        }
    }
}

/// Tool/function definition for structured output
///
/// - Anthropic: maps to `tools` array with `tool_choice`
/// - OpenAI: maps to `functions` array with `function_call`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Function name (the operation name)
    pub name: String,
    /// Description of what the function does
    pub description: String,
    /// JSON Schema for the function's parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn from_operation(op: &OperationSpec) -> Self {
        Self {
            name: op.name.clone(),
            description: op.description.clone(),
            parameters: op.parameters_schema(),
        }
    }

    /// Every registered operation, registry order
    pub fn all(registry: &OperationRegistry) -> Vec<Self> {
        registry.get_all().iter().map(Self::from_operation).collect()
    }
}

/// Result from a function call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Name of the function that was called
    pub tool_name: String,
    /// Arguments as JSON (an object, in the order the model produced them)
    pub arguments: serde_json::Value,
    /// Raw provider response text, for reporting
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw: String,
}

/// Characters of a provider response kept in debug logs
pub(crate) const LOG_PREVIEW_CHARS: usize = 1000;

/// Leading `max_chars` characters of `text`, cut on a char boundary
pub(crate) fn log_preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

/// Unified LLM client interface
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Plain text completion
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Chat with the given functions available, forcing `forced` to be called
    async fn call_function(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        forced: &str,
    ) -> Result<ToolCallResult>;

    /// Get the model name for logging
    fn model_name(&self) -> &str;

    /// Get the provider name for logging
    fn provider_name(&self) -> &str;
}
