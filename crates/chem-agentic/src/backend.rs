//! Backend Selection
//!
//! Which model provider serves segmentation and extraction.

use anyhow::{anyhow, Result};
use std::str::FromStr;

/// LLM backend provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentBackend {
    /// OpenAI GPT (default; function calling was designed against it)
    #[default]
    OpenAi,
    /// Anthropic Claude
    Anthropic,
}

impl AgentBackend {
    /// Create from AGENT_BACKEND environment variable
    ///
    /// Valid values: "openai", "gpt", "anthropic", "claude".
    /// Defaults to OpenAI if not set.
    pub fn from_env() -> Result<Self> {
        match std::env::var("AGENT_BACKEND") {
            Ok(value) => value
                .parse()
                .map_err(|e: ParseBackendError| anyhow!("{}", e)),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Get display name
    pub fn name(&self) -> &'static str {
        match self {
            AgentBackend::OpenAi => "OpenAI",
            AgentBackend::Anthropic => "Anthropic",
        }
    }

    /// Environment variable holding this provider's API key
    pub fn api_key_var(&self) -> &'static str {
        match self {
            AgentBackend::OpenAi => "OPENAI_API_KEY",
            AgentBackend::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    /// Environment variable overriding this provider's model
    pub fn model_var(&self) -> &'static str {
        match self {
            AgentBackend::OpenAi => "OPENAI_MODEL",
            AgentBackend::Anthropic => "ANTHROPIC_MODEL",
        }
    }
}

/// Error type for parsing AgentBackend
#[derive(Debug)]
pub struct ParseBackendError(String);

impl std::fmt::Display for ParseBackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ParseBackendError {}

impl FromStr for AgentBackend {
    type Err = ParseBackendError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "gpt" => Ok(AgentBackend::OpenAi),
            "anthropic" | "claude" => Ok(AgentBackend::Anthropic),
            other => Err(ParseBackendError(format!(
                "Unknown AGENT_BACKEND '{}'. Valid values: openai, gpt, anthropic, claude",
                other
            ))),
        }
    }
}

impl std::fmt::Display for AgentBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
