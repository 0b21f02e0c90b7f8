//! Pipeline configuration.
//!
//! Read from the environment, with `.env` support through dotenvy.

use chem_agentic::segmenter::DEFAULT_SEGMENT_MAX_TOKENS;
use chem_agentic::AgentBackend;
use thiserror::Error;

/// Default progress channel capacity
pub const DEFAULT_EVENT_BUFFER: usize = 1024;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{0}")]
    InvalidBackend(String),
}

/// Configuration for a conversion pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Model provider for segmentation and extraction.
    pub backend: AgentBackend,

    /// Model override; provider default when unset.
    pub model: Option<String>,

    /// Completion budget for segmentation.
    pub segment_max_tokens: u32,

    /// Progress channel capacity. Events beyond it are dropped and counted.
    pub event_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            backend: AgentBackend::default(),
            model: None,
            segment_max_tokens: DEFAULT_SEGMENT_MAX_TOKENS,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl PipelineConfig {
    /// Load `.env` if present, then read the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("AGENT_BACKEND") {
            config.backend = value
                .parse()
                .map_err(|e: chem_agentic::backend::ParseBackendError| {
                    ConfigError::InvalidBackend(e.to_string())
                })?;
        }

        config.model = lookup(config.backend.model_var()).filter(|m| !m.trim().is_empty());

        if let Some(value) = lookup("CHEM_SEGMENT_MAX_TOKENS") {
            config.segment_max_tokens = parse_positive("CHEM_SEGMENT_MAX_TOKENS", &value)?;
        }
        if let Some(value) = lookup("CHEM_EVENT_BUFFER") {
            config.event_buffer = parse_positive("CHEM_EVENT_BUFFER", &value)?;
        }

        Ok(config)
    }

    /// Set the backend.
    pub fn backend(mut self, backend: AgentBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Set the segmentation token budget.
    pub fn segment_max_tokens(mut self, max_tokens: u32) -> Self {
        self.segment_max_tokens = max_tokens;
        self
    }

    /// Set the event buffer size.
    pub fn event_buffer(mut self, size: usize) -> Self {
        self.event_buffer = size;
        self
    }
}

fn parse_positive<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match value.trim().parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            var,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.segment_max_tokens, 2000);
        assert_eq!(config.backend, AgentBackend::OpenAi);
    }

    #[test]
    fn test_env_overrides() {
        let config = PipelineConfig::from_lookup(lookup(&[
            ("AGENT_BACKEND", "claude"),
            ("ANTHROPIC_MODEL", "claude-x"),
            ("OPENAI_MODEL", "ignored"),
            ("CHEM_SEGMENT_MAX_TOKENS", "512"),
            ("CHEM_EVENT_BUFFER", "16"),
        ]))
        .unwrap();
        assert_eq!(config.backend, AgentBackend::Anthropic);
        assert_eq!(config.model.as_deref(), Some("claude-x"));
        assert_eq!(config.segment_max_tokens, 512);
        assert_eq!(config.event_buffer, 16);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            PipelineConfig::from_lookup(lookup(&[("CHEM_EVENT_BUFFER", "0")])),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(
            PipelineConfig::from_lookup(lookup(&[("CHEM_SEGMENT_MAX_TOKENS", "lots")])),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(
            PipelineConfig::from_lookup(lookup(&[("AGENT_BACKEND", "davinci")])),
            Err(ConfigError::InvalidBackend(_))
        ));
    }

    #[test]
    fn test_builder_pattern() {
        let config = PipelineConfig::default()
            .backend(AgentBackend::Anthropic)
            .segment_max_tokens(100)
            .event_buffer(8);
        assert_eq!(config.backend, AgentBackend::Anthropic);
        assert_eq!(config.segment_max_tokens, 100);
        assert_eq!(config.event_buffer, 8);
    }
}
