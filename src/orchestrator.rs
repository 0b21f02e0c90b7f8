//! Procedure Converter
//!
//! Main entry point for procedure → script conversion.
//! Coordinates segmentation, matching, argument extraction and rendering.

use std::sync::Arc;
use std::time::Instant;

use chem_agentic::{ArgumentExtractor, Instruction, LlmClient, Segmenter};
use chem_ops_types::{OperationRegistry, RegistryError, StructuredCall};
use chem_semantic_matcher::{MatchResult, SemanticMatcher};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{ConversionError, InstructionError};
use crate::events::{PipelineEvent, SharedEmitter};

/// A validated, rendered call for one instruction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesizedCall {
    pub call: StructuredCall,
    /// Rendered script line
    pub code: String,
    /// Raw model response the arguments came from
    #[serde(skip_serializing_if = "String::is_empty")]
    pub raw: String,
}

/// What happened to one instruction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstructionOutcome {
    pub index: usize,
    pub instruction: String,
    /// Matched operation, absent when matching itself failed
    pub matched: Option<MatchResult>,
    pub result: Result<SynthesizedCall, InstructionError>,
}

impl InstructionOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Result of converting a whole procedure
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub conversion_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// One outcome per instruction, in procedure order
    pub outcomes: Vec<InstructionOutcome>,
}

impl ConversionReport {
    /// Successful calls in procedure order
    pub fn calls(&self) -> Vec<&SynthesizedCall> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .collect()
    }

    /// Flagged instructions with their errors
    pub fn failures(&self) -> Vec<(&InstructionOutcome, &InstructionError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o, e)))
            .collect()
    }

    /// True when every instruction produced a call
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(InstructionOutcome::is_ok)
    }

    /// Rendered calls joined by newlines
    pub fn script(&self) -> String {
        self.calls()
            .iter()
            .map(|c| c.code.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Converts free-text procedures into instrument script
pub struct ProcedureConverter {
    registry: Arc<OperationRegistry>,
    segmenter: Segmenter,
    matcher: SemanticMatcher,
    extractor: ArgumentExtractor,
    emitter: Option<SharedEmitter>,
}

impl ProcedureConverter {
    /// Create a converter over the embedded catalog
    pub fn new(client: Arc<dyn LlmClient>) -> Result<Self, RegistryError> {
        ConverterBuilder::new(client).build()
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn matcher(&self) -> &SemanticMatcher {
        &self.matcher
    }

    /// Segment a procedure without converting it
    pub async fn segment(&self, procedure_text: &str) -> Result<Vec<Instruction>, ConversionError> {
        Ok(self.segmenter.segment(procedure_text).await?)
    }

    /// Convert a procedure
    ///
    /// Segmentation failure is fatal. After that, each instruction is
    /// matched and extracted in order and failures are recorded per
    /// instruction without stopping the loop.
    pub async fn convert(&self, procedure_text: &str) -> Result<ConversionReport, ConversionError> {
        let conversion_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        self.emit(PipelineEvent::started(conversion_id, procedure_text.len()));

        let instructions = match self.segmenter.segment(procedure_text).await {
            Ok(instructions) => instructions,
            Err(e) => {
                let error = ConversionError::from(e);
                tracing::error!("Conversion {} failed: {}", conversion_id, error);
                self.emit(PipelineEvent::conversion_failed(conversion_id, &error));
                return Err(error);
            }
        };
        self.emit(PipelineEvent::segmented(conversion_id, instructions.len()));

        let mut outcomes = Vec::with_capacity(instructions.len());
        for instruction in &instructions {
            outcomes.push(
                self.run_instruction(conversion_id, instruction.index, &instruction.text)
                    .await,
            );
        }

        let report = ConversionReport {
            conversion_id,
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            outcomes,
        };
        let failed = report.failures().len();
        tracing::info!(
            "Conversion {} finished: {} calls, {} flagged",
            conversion_id,
            report.outcomes.len() - failed,
            failed
        );
        self.emit(PipelineEvent::finished(
            conversion_id,
            report.outcomes.len() - failed,
            failed,
            report.duration_ms,
        ));
        Ok(report)
    }

    /// Match and extract a single instruction
    pub async fn convert_instruction(&self, index: usize, text: &str) -> InstructionOutcome {
        self.run_instruction(Uuid::new_v4(), index, text).await
    }

    async fn run_instruction(&self, conversion_id: Uuid, index: usize, text: &str) -> InstructionOutcome {
        let mut matched = None;
        let result = self
            .synthesize(conversion_id, index, text, &mut matched)
            .await;

        if let Err(error) = &result {
            tracing::warn!("Instruction {} '{}' flagged: {}", index, text, error);
            self.emit(PipelineEvent::instruction_failed(
                conversion_id,
                index,
                text,
                error,
            ));
        }

        InstructionOutcome {
            index,
            instruction: text.to_string(),
            matched,
            result,
        }
    }

    /// Match → extract → render. The match is stored in `matched` as soon as
    /// it exists so that later failures still report it.
    async fn synthesize(
        &self,
        conversion_id: Uuid,
        index: usize,
        text: &str,
        matched: &mut Option<MatchResult>,
    ) -> Result<SynthesizedCall, InstructionError> {
        let found = self.matcher.find_match(text)?;
        self.emit(PipelineEvent::matched(
            conversion_id,
            index,
            text,
            &found.operation_name,
            found.confidence,
        ));
        let operation = self.registry.get(&found.operation_name);
        *matched = Some(found);
        let operation = operation?;

        // Reported before validation so flagged instructions keep the response
        let response = self.extractor.request(text, operation).await?;
        self.emit(PipelineEvent::model_response(
            conversion_id,
            index,
            &operation.name,
            &response.raw,
        ));
        let extraction = self.extractor.validate_response(operation, response)?;
        self.emit(PipelineEvent::synthesized(
            conversion_id,
            index,
            &operation.name,
            &extraction.code,
        ));

        Ok(SynthesizedCall {
            call: extraction.call,
            code: extraction.code,
            raw: extraction.raw,
        })
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(emitter) = &self.emitter {
            emitter.emit(event);
        }
    }
}

/// Builder for ProcedureConverter
pub struct ConverterBuilder {
    client: Arc<dyn LlmClient>,
    registry: Option<OperationRegistry>,
    emitter: Option<SharedEmitter>,
    segment_max_tokens: Option<u32>,
}

impl ConverterBuilder {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            registry: None,
            emitter: None,
            segment_max_tokens: None,
        }
    }

    /// Use a custom catalog instead of the embedded one
    pub fn registry(mut self, registry: OperationRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Report progress through this emitter
    pub fn emitter(mut self, emitter: SharedEmitter) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn segment_max_tokens(mut self, max_tokens: u32) -> Self {
        self.segment_max_tokens = Some(max_tokens);
        self
    }

    /// Apply pipeline settings
    pub fn config(self, config: &PipelineConfig) -> Self {
        self.segment_max_tokens(config.segment_max_tokens)
    }

    /// Build the converter
    pub fn build(self) -> Result<ProcedureConverter, RegistryError> {
        let registry = match self.registry {
            Some(registry) => registry,
            None => OperationRegistry::global()?.clone(),
        };

        let mut segmenter = Segmenter::new(self.client.clone());
        if let Some(max_tokens) = self.segment_max_tokens {
            segmenter = segmenter.with_max_tokens(max_tokens);
        }

        Ok(ProcedureConverter {
            matcher: SemanticMatcher::new(&registry),
            extractor: ArgumentExtractor::new(self.client, &registry),
            segmenter,
            registry: Arc::new(registry),
            emitter: self.emitter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chem_agentic::ScriptedLlmClient;
    use serde_json::json;

    #[tokio::test]
    async fn test_convert_single_instruction() {
        let client = Arc::new(
            ScriptedLlmClient::new()
                .with_completion("Prime pump 1 with 30 mL using chemspd as manager.")
                .with_arguments(json!({"pump": 1, "volume": 30})),
        );
        let converter = ProcedureConverter::new(client).unwrap();

        let report = converter.convert("Prime pump 1 with 30 mL.").await.unwrap();
        assert!(report.is_complete());
        assert_eq!(
            report.script(),
            "routines.prime_pumps(chmspd=chmspd, pump=1, volume=30)"
        );
        assert_eq!(
            report.outcomes[0].matched.as_ref().map(|m| m.operation_name.as_str()),
            Some("prime_pumps")
        );
    }

    #[tokio::test]
    async fn test_ambiguous_instruction_is_flagged_without_model_call() {
        let client = Arc::new(ScriptedLlmClient::new());
        let converter = ProcedureConverter::new(client.clone()).unwrap();

        let outcome = converter.convert_instruction(0, "Do it with the one.").await;
        assert!(outcome.matched.is_none());
        assert!(matches!(
            outcome.result,
            Err(InstructionError::AmbiguousInstruction { .. })
        ));
        assert!(client.recorded().forced.is_empty());
    }

    #[tokio::test]
    async fn test_segment_max_tokens_from_config() {
        let client = Arc::new(ScriptedLlmClient::new().with_completion("Filter the liquid"));
        let converter = ConverterBuilder::new(client.clone())
            .config(&PipelineConfig::default().segment_max_tokens(300))
            .build()
            .unwrap();

        let instructions = converter.segment("Filter it").await.unwrap();
        assert_eq!(instructions.len(), 1);
        assert_eq!(client.recorded().completions[0].max_tokens, 300);
    }

    #[test]
    fn test_report_helpers() {
        let ok = InstructionOutcome {
            index: 0,
            instruction: "a".into(),
            matched: None,
            result: Ok(SynthesizedCall {
                call: StructuredCall::new("filter_liquid", Default::default()),
                code: "routines.filter_liquid(chmspd=chmspd)".into(),
                raw: String::new(),
            }),
        };
        let flagged = InstructionOutcome {
            index: 1,
            instruction: "b".into(),
            matched: None,
            result: Err(InstructionError::AmbiguousInstruction {
                instruction: "b".into(),
            }),
        };
        let report = ConversionReport {
            conversion_id: Uuid::nil(),
            started_at: Utc::now(),
            duration_ms: 0,
            outcomes: vec![ok, flagged],
        };
        assert!(!report.is_complete());
        assert_eq!(report.calls().len(), 1);
        assert_eq!(report.failures()[0].0.index, 1);
        assert_eq!(report.script(), "routines.filter_liquid(chmspd=chmspd)");
    }
}
