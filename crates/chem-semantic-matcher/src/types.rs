//! Matcher result and error types

use chem_ops_types::RegistryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result of matching one instruction against the operation catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// The instruction as given
    pub instruction: String,
    /// Name of the best matching operation
    pub operation_name: String,
    /// Cosine similarity between instruction and operation description (0.0 - 1.0)
    pub confidence: f32,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatcherError {
    /// Nothing left to compare once stop-words and punctuation are removed
    #[error("Instruction '{0}' has no meaningful terms to match")]
    AmbiguousInstruction(String),

    #[error("Operation catalog unavailable: {0}")]
    Registry(#[from] RegistryError),
}
