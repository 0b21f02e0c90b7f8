//! Scripted LLM client
//!
//! Replays canned responses in order. Used by tests and by offline dry runs
//! so that validation and rendering can be exercised without a provider.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::llm_client::{ChatMessage, CompletionRequest, LlmClient, ToolCallResult, ToolDefinition};

/// One canned function-call reply
#[derive(Debug, Clone)]
enum ScriptedCall {
    /// Answer with the forced function and these arguments
    Arguments(serde_json::Value),
    /// Answer with a different function name
    Named(String, serde_json::Value),
    Fail(String),
}

/// Script file format for dry runs
#[derive(Debug, Deserialize)]
struct ScriptFile {
    segments: String,
    #[serde(default)]
    calls: Vec<serde_json::Value>,
}

/// Requests seen by the scripted client
#[derive(Debug, Clone, Default)]
pub struct RecordedRequests {
    pub completions: Vec<CompletionRequest>,
    /// Forced function name of each function call, in order
    pub forced: Vec<String>,
    /// Last user message of each function call, in order
    pub instructions: Vec<String>,
}

/// In-memory client returning queued responses
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    completions: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<VecDeque<ScriptedCall>>,
    recorded: Mutex<RecordedRequests>,
}

impl ScriptedLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a dry-run script: `{"segments": "...", "calls": [{..args..}, ..]}`
    pub fn from_json_script(source: &str) -> Result<Self> {
        let script: ScriptFile =
            serde_json::from_str(source).map_err(|e| anyhow!("Invalid script: {}", e))?;
        let client = Self::new().with_completion(script.segments);
        Ok(script
            .calls
            .into_iter()
            .fold(client, |c, args| c.with_arguments(args)))
    }

    /// Queue a completion response
    pub fn with_completion(self, text: impl Into<String>) -> Self {
        self.push_completion(Ok(text.into()));
        self
    }

    /// Queue a completion failure
    pub fn with_completion_error(self, message: impl Into<String>) -> Self {
        self.push_completion(Err(message.into()));
        self
    }

    /// Queue a function-call response naming the forced function
    pub fn with_arguments(self, arguments: serde_json::Value) -> Self {
        self.push_call(ScriptedCall::Arguments(arguments));
        self
    }

    /// Queue a function-call response naming another function
    pub fn with_named_call(self, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        self.push_call(ScriptedCall::Named(name.into(), arguments));
        self
    }

    /// Queue a function-call failure
    pub fn with_call_error(self, message: impl Into<String>) -> Self {
        self.push_call(ScriptedCall::Fail(message.into()));
        self
    }

    /// Snapshot of the requests received so far
    pub fn recorded(&self) -> RecordedRequests {
        self.recorded
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn push_completion(&self, response: Result<String, String>) {
        if let Ok(mut queue) = self.completions.lock() {
            queue.push_back(response);
        }
    }

    fn push_call(&self, call: ScriptedCall) {
        if let Ok(mut queue) = self.calls.lock() {
            queue.push_back(call);
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        if let Ok(mut recorded) = self.recorded.lock() {
            recorded.completions.push(request.clone());
        }
        let next = self
            .completions
            .lock()
            .map_err(|_| anyhow!("scripted client poisoned"))?
            .pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("No scripted completion left")),
        }
    }

    async fn call_function(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolDefinition],
        forced: &str,
    ) -> Result<ToolCallResult> {
        if let Ok(mut recorded) = self.recorded.lock() {
            recorded.forced.push(forced.to_string());
            recorded.instructions.push(
                messages
                    .last()
                    .map(|m| m.content.clone())
                    .unwrap_or_default(),
            );
        }
        let next = self
            .calls
            .lock()
            .map_err(|_| anyhow!("scripted client poisoned"))?
            .pop_front();
        let (tool_name, arguments) = match next {
            Some(ScriptedCall::Arguments(arguments)) => (forced.to_string(), arguments),
            Some(ScriptedCall::Named(name, arguments)) => (name, arguments),
            Some(ScriptedCall::Fail(message)) => return Err(anyhow!(message)),
            None => return Err(anyhow!("No scripted function call left")),
        };
        let raw = serde_json::json!({
            "function_call": {"name": &tool_name, "arguments": arguments.to_string()}
        })
        .to_string();
        Ok(ToolCallResult {
            tool_name,
            arguments,
            raw,
        })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }

    fn provider_name(&self) -> &str {
        "Scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order() {
        let client = ScriptedLlmClient::new()
            .with_completion("a\nb")
            .with_arguments(serde_json::json!({"pump": 1}))
            .with_call_error("provider down");

        let text = client
            .complete(&CompletionRequest::deterministic("p", 10))
            .await
            .unwrap();
        assert_eq!(text, "a\nb");

        let call = client
            .call_function(&[ChatMessage::user("Prime pump 1")], &[], "prime_pumps")
            .await
            .unwrap();
        assert_eq!(call.tool_name, "prime_pumps");
        assert_eq!(call.arguments["pump"], 1);

        assert!(client.call_function(&[], &[], "x").await.is_err());
        assert!(client.call_function(&[], &[], "x").await.is_err());

        let recorded = client.recorded();
        assert_eq!(recorded.forced, vec!["prime_pumps", "x", "x"]);
        assert_eq!(recorded.instructions[0], "Prime pump 1");
    }

    #[test]
    fn test_from_json_script() {
        let client = ScriptedLlmClient::from_json_script(
            r#"{"segments": "Prime pump 1", "calls": [{"pump": 1, "volume": 30}]}"#,
        )
        .unwrap();
        assert_eq!(client.completions.lock().unwrap().len(), 1);
        assert_eq!(client.calls.lock().unwrap().len(), 1);
    }
}
