//! Progress event types for procedure conversion.
//!
//! Events are created on the conversion path, so they stay small: strings
//! and counters only, no borrowed model payloads beyond the raw response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConversionError, InstructionError};

/// Raw model responses longer than this are truncated in events
const MAX_RAW_LEN: usize = 2000;

/// One progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// When the event occurred
    pub timestamp: DateTime<Utc>,

    /// Conversion this event belongs to
    pub conversion_id: Uuid,

    /// Event payload
    pub payload: EventPayload,
}

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventPayload {
    ConversionStarted {
        /// Procedure length in bytes
        text_len: usize,
    },

    InstructionsSegmented {
        count: usize,
    },

    FunctionMatched {
        index: usize,
        instruction: String,
        operation: String,
        confidence: f32,
    },

    ModelResponse {
        index: usize,
        operation: String,
        raw: String,
    },

    CallSynthesized {
        index: usize,
        operation: String,
        code: String,
    },

    InstructionFailed {
        index: usize,
        instruction: String,
        error: ErrorSnapshot,
    },

    ConversionFailed {
        error: ErrorSnapshot,
    },

    ConversionFinished {
        succeeded: usize,
        failed: usize,
        duration_ms: u64,
    },
}

impl EventPayload {
    /// Get the event type as a string
    pub fn event_type_str(&self) -> &'static str {
        match self {
            EventPayload::ConversionStarted { .. } => "conversion_started",
            EventPayload::InstructionsSegmented { .. } => "instructions_segmented",
            EventPayload::FunctionMatched { .. } => "function_matched",
            EventPayload::ModelResponse { .. } => "model_response",
            EventPayload::CallSynthesized { .. } => "call_synthesized",
            EventPayload::InstructionFailed { .. } => "instruction_failed",
            EventPayload::ConversionFailed { .. } => "conversion_failed",
            EventPayload::ConversionFinished { .. } => "conversion_finished",
        }
    }

    /// Instruction index, for per-instruction events
    pub fn index(&self) -> Option<usize> {
        match self {
            EventPayload::FunctionMatched { index, .. }
            | EventPayload::ModelResponse { index, .. }
            | EventPayload::CallSynthesized { index, .. }
            | EventPayload::InstructionFailed { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Error summary carried by failure events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSnapshot {
    /// Error kind (e.g. "type_mismatch")
    pub kind: String,

    pub message: String,

    /// Offending field, when there is one
    pub field: Option<String>,

    /// Declared type of the offending field
    pub expected: Option<String>,
}

impl From<&InstructionError> for ErrorSnapshot {
    fn from(error: &InstructionError) -> Self {
        Self {
            kind: error.kind().to_string(),
            message: error.to_string(),
            field: error.field().map(str::to_string),
            expected: error.expected_type().map(|t| t.as_str().to_string()),
        }
    }
}

impl From<&ConversionError> for ErrorSnapshot {
    fn from(error: &ConversionError) -> Self {
        let kind = match error {
            ConversionError::SegmentationFailure(_) => "segmentation_failure",
            ConversionError::ExternalCollaboratorUnavailable(_) => {
                "external_collaborator_unavailable"
            }
        };
        Self {
            kind: kind.to_string(),
            message: error.to_string(),
            field: None,
            expected: None,
        }
    }
}

impl PipelineEvent {
    fn now(conversion_id: Uuid, payload: EventPayload) -> Self {
        Self {
            timestamp: Utc::now(),
            conversion_id,
            payload,
        }
    }

    pub fn started(conversion_id: Uuid, text_len: usize) -> Self {
        Self::now(conversion_id, EventPayload::ConversionStarted { text_len })
    }

    pub fn segmented(conversion_id: Uuid, count: usize) -> Self {
        Self::now(conversion_id, EventPayload::InstructionsSegmented { count })
    }

    pub fn matched(
        conversion_id: Uuid,
        index: usize,
        instruction: &str,
        operation: &str,
        confidence: f32,
    ) -> Self {
        Self::now(
            conversion_id,
            EventPayload::FunctionMatched {
                index,
                instruction: instruction.to_string(),
                operation: operation.to_string(),
                confidence,
            },
        )
    }

    pub fn model_response(conversion_id: Uuid, index: usize, operation: &str, raw: &str) -> Self {
        let raw = match raw.char_indices().nth(MAX_RAW_LEN) {
            Some((cut, _)) => format!("{}...", &raw[..cut]),
            None => raw.to_string(),
        };
        Self::now(
            conversion_id,
            EventPayload::ModelResponse {
                index,
                operation: operation.to_string(),
                raw,
            },
        )
    }

    pub fn synthesized(conversion_id: Uuid, index: usize, operation: &str, code: &str) -> Self {
        Self::now(
            conversion_id,
            EventPayload::CallSynthesized {
                index,
                operation: operation.to_string(),
                code: code.to_string(),
            },
        )
    }

    pub fn instruction_failed(
        conversion_id: Uuid,
        index: usize,
        instruction: &str,
        error: &InstructionError,
    ) -> Self {
        Self::now(
            conversion_id,
            EventPayload::InstructionFailed {
                index,
                instruction: instruction.to_string(),
                error: error.into(),
            },
        )
    }

    pub fn conversion_failed(conversion_id: Uuid, error: &ConversionError) -> Self {
        Self::now(
            conversion_id,
            EventPayload::ConversionFailed {
                error: error.into(),
            },
        )
    }

    pub fn finished(conversion_id: Uuid, succeeded: usize, failed: usize, duration_ms: u64) -> Self {
        Self::now(
            conversion_id,
            EventPayload::ConversionFinished {
                succeeded,
                failed,
                duration_ms,
            },
        )
    }
}
