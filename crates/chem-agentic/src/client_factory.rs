//! LLM client construction from backend selection

use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::anthropic_client::AnthropicClient;
use crate::backend::AgentBackend;
use crate::llm_client::LlmClient;
use crate::openai_client::OpenAiClient;

/// Create a client for the backend named by AGENT_BACKEND
pub fn create_llm_client() -> Result<Arc<dyn LlmClient>> {
    create_llm_client_for(AgentBackend::from_env()?)
}

/// Create a client for a specific backend, key read from its env variable
pub fn create_llm_client_for(backend: AgentBackend) -> Result<Arc<dyn LlmClient>> {
    let api_key = std::env::var(backend.api_key_var())
        .map_err(|_| anyhow!("{} environment variable not set", backend.api_key_var()))?;
    Ok(create_llm_client_with_key(backend, api_key, None))
}

/// Create a client with an explicit key and optional model override
pub fn create_llm_client_with_key(
    backend: AgentBackend,
    api_key: String,
    model: Option<&str>,
) -> Arc<dyn LlmClient> {
    let client: Arc<dyn LlmClient> = match (backend, model) {
        (AgentBackend::OpenAi, Some(model)) => Arc::new(OpenAiClient::with_model(api_key, model)),
        (AgentBackend::OpenAi, None) => Arc::new(OpenAiClient::new(api_key)),
        (AgentBackend::Anthropic, Some(model)) => {
            Arc::new(AnthropicClient::with_model(api_key, model))
        }
        (AgentBackend::Anthropic, None) => Arc::new(AnthropicClient::new(api_key)),
    };
    tracing::info!(
        "Using {} backend with model {}",
        client.provider_name(),
        client.model_name()
    );
    client
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_model() {
        let client =
            create_llm_client_with_key(AgentBackend::Anthropic, "k".to_string(), Some("claude-x"));
        assert_eq!(client.provider_name(), "Anthropic");
        assert_eq!(client.model_name(), "claude-x");

        let client = create_llm_client_with_key(AgentBackend::OpenAi, "k".to_string(), Some("gpt-4"));
        assert_eq!(client.provider_name(), "OpenAI");
    }
}
