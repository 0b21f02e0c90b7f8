//! Semantic Matcher - TF-IDF cosine similarity over operation descriptions
//!
//! The main entry point for instruction → operation matching.

use chem_ops_types::OperationRegistry;
use tracing::{debug, instrument};

use crate::{
    normalizer::Normalizer,
    similarity::{argmax, cosine_similarity},
    tfidf::{is_term, TfidfMatrix},
    types::{MatchResult, MatcherError},
};

/// Normalized description of one registered operation
#[derive(Debug, Clone)]
struct OperationProfile {
    name: String,
    tokens: Vec<String>,
}

/// Matches free-text instructions to registered operations
///
/// Best-effort classifier: there is no confidence threshold, so any
/// instruction with at least one meaningful term is matched to some
/// operation. Callers validate downstream.
#[derive(Debug, Clone)]
pub struct SemanticMatcher {
    normalizer: Normalizer,
    profiles: Vec<OperationProfile>,
}

impl SemanticMatcher {
    /// Build a matcher over the registry's operations
    ///
    /// Descriptions are normalized once here; only the instruction is
    /// normalized per call.
    pub fn new(registry: &OperationRegistry) -> Self {
        let normalizer = Normalizer::new();
        let profiles = registry
            .get_all()
            .iter()
            .map(|op| OperationProfile {
                name: op.name.clone(),
                tokens: normalizer.normalize(&op.description),
            })
            .collect();

        Self {
            normalizer,
            profiles,
        }
    }

    /// Build a matcher over the embedded catalog
    pub fn from_global() -> Result<Self, MatcherError> {
        Ok(Self::new(OperationRegistry::global()?))
    }

    /// Find the best matching operation for an instruction
    ///
    /// Ties go to the operation registered first.
    #[instrument(skip(self), fields(instruction = %instruction))]
    pub fn find_match(&self, instruction: &str) -> Result<MatchResult, MatcherError> {
        let scores = self.score(instruction)?;
        let best = argmax(&scores).ok_or_else(|| {
            MatcherError::AmbiguousInstruction(instruction.to_string())
        })?;

        let result = MatchResult {
            instruction: instruction.to_string(),
            operation_name: self.profiles[best].name.clone(),
            confidence: scores[best],
        };
        debug!(
            "Matched '{}' -> {} ({:.3})",
            instruction, result.operation_name, result.confidence
        );
        Ok(result)
    }

    /// All operations ranked by similarity, best first
    ///
    /// Equal scores keep registry order.
    pub fn rank(&self, instruction: &str) -> Result<Vec<MatchResult>, MatcherError> {
        let scores = self.score(instruction)?;
        let mut ranked: Vec<MatchResult> = self
            .profiles
            .iter()
            .zip(scores)
            .map(|(profile, confidence)| MatchResult {
                instruction: instruction.to_string(),
                operation_name: profile.name.clone(),
                confidence,
            })
            .collect();
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Ok(ranked)
    }

    /// Cosine similarity of the instruction against every operation, registry order
    fn score(&self, instruction: &str) -> Result<Vec<f32>, MatcherError> {
        let tokens = self.normalizer.normalize(instruction);
        if !tokens.iter().any(|t| is_term(t)) {
            return Err(MatcherError::AmbiguousInstruction(instruction.to_string()));
        }

        // Instruction is document 0, descriptions follow in registry order
        let mut corpus: Vec<&[String]> = Vec::with_capacity(self.profiles.len() + 1);
        corpus.push(&tokens);
        corpus.extend(self.profiles.iter().map(|p| p.tokens.as_slice()));
        let documents: Vec<Vec<&str>> = corpus
            .iter()
            .map(|doc| doc.iter().map(String::as_str).collect())
            .collect();

        let matrix = TfidfMatrix::fit_transform(&documents);
        let rows = matrix.rows();
        let query = &rows[0];

        Ok(rows[1..]
            .iter()
            .map(|row| cosine_similarity(query, row))
            .collect())
    }

    /// Number of operations this matcher can choose from
    pub fn operation_count(&self) -> usize {
        self.profiles.len()
    }
}

/// One-shot match against a registry
pub fn match_operation(
    instruction: &str,
    registry: &OperationRegistry,
) -> Result<String, MatcherError> {
    SemanticMatcher::new(registry)
        .find_match(instruction)
        .map(|m| m.operation_name)
}
