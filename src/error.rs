//! Error types for procedure conversion
//!
//! Two levels: `ConversionError` stops a whole conversion, `InstructionError`
//! flags a single instruction and the conversion carries on.

use chem_agentic::{ExtractionError, SegmentError};
use chem_ops_types::{FieldType, RegistryError};
use chem_semantic_matcher::MatcherError;
use serde::Serialize;
use thiserror::Error;

/// Fatal conversion errors
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ConversionError {
    #[error("Could not segment procedure: {0}")]
    SegmentationFailure(String),

    #[error("External collaborator unavailable: {0}")]
    ExternalCollaboratorUnavailable(String),
}

impl From<SegmentError> for ConversionError {
    fn from(error: SegmentError) -> Self {
        match error {
            SegmentError::Collaborator(message) => {
                ConversionError::ExternalCollaboratorUnavailable(message)
            }
            other => ConversionError::SegmentationFailure(other.to_string()),
        }
    }
}

/// Per-instruction errors
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstructionError {
    #[error("Unknown operation '{name}'")]
    UnknownOperation { name: String },

    #[error("Instruction has no meaningful terms: '{instruction}'")]
    AmbiguousInstruction { instruction: String },

    #[error("'{field}' is not a parameter of {operation}")]
    UnknownArgument { operation: String, field: String },

    #[error("{operation}.{field}: expected {expected}, found {found}")]
    TypeMismatch {
        operation: String,
        field: String,
        expected: FieldType,
        found: String,
    },

    #[error("{operation} is missing required arguments: {}", fields.join(", "))]
    MissingRequiredArgument {
        operation: String,
        fields: Vec<String>,
    },

    #[error("External collaborator unavailable: {message}")]
    ExternalCollaboratorUnavailable { message: String },

    #[error("Invalid model response: {message}")]
    InvalidResponse { message: String },
}

impl InstructionError {
    /// Short machine-readable kind, used in events
    pub fn kind(&self) -> &'static str {
        match self {
            InstructionError::UnknownOperation { .. } => "unknown_operation",
            InstructionError::AmbiguousInstruction { .. } => "ambiguous_instruction",
            InstructionError::UnknownArgument { .. } => "unknown_argument",
            InstructionError::TypeMismatch { .. } => "type_mismatch",
            InstructionError::MissingRequiredArgument { .. } => "missing_required_argument",
            InstructionError::ExternalCollaboratorUnavailable { .. } => {
                "external_collaborator_unavailable"
            }
            InstructionError::InvalidResponse { .. } => "invalid_response",
        }
    }

    /// Field the error refers to, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            InstructionError::UnknownArgument { field, .. }
            | InstructionError::TypeMismatch { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Expected type, for type mismatches
    pub fn expected_type(&self) -> Option<FieldType> {
        match self {
            InstructionError::TypeMismatch { expected, .. } => Some(*expected),
            _ => None,
        }
    }
}

impl From<RegistryError> for InstructionError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::UnknownOperation(name) => InstructionError::UnknownOperation { name },
            other => InstructionError::InvalidResponse {
                message: other.to_string(),
            },
        }
    }
}

impl From<MatcherError> for InstructionError {
    fn from(error: MatcherError) -> Self {
        match error {
            MatcherError::AmbiguousInstruction(instruction) => {
                InstructionError::AmbiguousInstruction { instruction }
            }
            MatcherError::Registry(inner) => inner.into(),
        }
    }
}

impl From<ExtractionError> for InstructionError {
    fn from(error: ExtractionError) -> Self {
        match error {
            ExtractionError::UnknownArgument { operation, field } => {
                InstructionError::UnknownArgument { operation, field }
            }
            ExtractionError::TypeMismatch {
                operation,
                field,
                expected,
                found,
            } => InstructionError::TypeMismatch {
                operation,
                field,
                expected,
                found,
            },
            ExtractionError::MissingRequiredArgument { operation, fields } => {
                InstructionError::MissingRequiredArgument { operation, fields }
            }
            ExtractionError::Collaborator(message) => {
                InstructionError::ExternalCollaboratorUnavailable { message }
            }
            other @ (ExtractionError::OperationMismatch { .. }
            | ExtractionError::MalformedArguments(_)) => InstructionError::InvalidResponse {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_errors() {
        assert!(matches!(
            ConversionError::from(SegmentError::Collaborator("503".into())),
            ConversionError::ExternalCollaboratorUnavailable(_)
        ));
        assert!(matches!(
            ConversionError::from(SegmentError::NoActions),
            ConversionError::SegmentationFailure(_)
        ));
    }

    #[test]
    fn test_extraction_errors_keep_field() {
        let err: InstructionError = ExtractionError::TypeMismatch {
            operation: "prime_pumps".into(),
            field: "pump".into(),
            expected: FieldType::Integer,
            found: "string \"one\"".into(),
        }
        .into();
        assert_eq!(err.kind(), "type_mismatch");
        assert_eq!(err.field(), Some("pump"));
        assert_eq!(err.expected_type(), Some(FieldType::Integer));

        let err: InstructionError = ExtractionError::MalformedArguments("x".into()).into();
        assert_eq!(err.kind(), "invalid_response");
    }

    #[test]
    fn test_matcher_errors() {
        let err: InstructionError = MatcherError::AmbiguousInstruction("the".into()).into();
        assert_eq!(err.kind(), "ambiguous_instruction");

        let err: InstructionError =
            MatcherError::Registry(RegistryError::UnknownOperation("stir".into())).into();
        assert_eq!(
            err,
            InstructionError::UnknownOperation {
                name: "stir".into()
            }
        );
    }

    #[test]
    fn test_serializes_with_kind() {
        let err = InstructionError::MissingRequiredArgument {
            operation: "transfer_liquid".into(),
            fields: vec!["volume".into()],
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "missing_required_argument");
        assert_eq!(json["fields"][0], "volume");
    }
}
