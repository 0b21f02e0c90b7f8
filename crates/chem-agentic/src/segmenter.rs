//! Instruction Segmenter
//!
//! Splits a free-form procedure into an ordered list of single actions by
//! asking the completion model, then cleaning up its line-oriented answer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm_client::{CompletionRequest, LlmClient};

/// Default completion budget for segmentation
pub const DEFAULT_SEGMENT_MAX_TOKENS: u32 = 2000;

/// Segmentation errors
#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("Procedure text is empty")]
    EmptyProcedure,

    #[error("Model returned no actions")]
    NoActions,

    #[error("Completion model unavailable: {0}")]
    Collaborator(String),
}

/// One action in the segmented procedure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Zero-based position in the procedure
    pub index: usize,
    pub text: String,
}

/// Prompt sent to the completion model
pub fn segment_prompt(procedure_text: &str) -> String {
    format!(
        "Transform the following instructions into structured actions:\n\"{}\".\n\nActions:\n",
        procedure_text
    )
}

/// Split a model response into action lines
///
/// Lines are trimmed and blank lines dropped. Order and duplicates are kept.
pub fn split_actions(response: &str) -> Vec<String> {
    response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Segmenter backed by a completion model
pub struct Segmenter {
    client: Arc<dyn LlmClient>,
    max_tokens: u32,
}

impl Segmenter {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            max_tokens: DEFAULT_SEGMENT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Segment a procedure into ordered instructions
    #[tracing::instrument(skip(self, procedure_text), fields(len = procedure_text.len()))]
    pub async fn segment(&self, procedure_text: &str) -> Result<Vec<Instruction>, SegmentError> {
        if procedure_text.trim().is_empty() {
            return Err(SegmentError::EmptyProcedure);
        }

        let request = CompletionRequest::deterministic(segment_prompt(procedure_text), self.max_tokens);
        let response = self.client.complete(&request).await.map_err(|e| {
            tracing::warn!("Segmentation call to {} failed: {}", self.client.provider_name(), e);
            SegmentError::Collaborator(e.to_string())
        })?;

        let instructions: Vec<Instruction> = split_actions(&response)
            .into_iter()
            .enumerate()
            .map(|(index, text)| Instruction { index, text })
            .collect();

        if instructions.is_empty() {
            return Err(SegmentError::NoActions);
        }

        tracing::info!("Segmented procedure into {} actions", instructions.len());
        Ok(instructions)
    }
}
