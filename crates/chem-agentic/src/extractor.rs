//! Argument Extractor
//!
//! Asks the function-calling model to fill in the parameters of an already
//! matched operation, then validates the returned arguments against the
//! operation schema. Nothing the model says reaches a `StructuredCall`
//! without passing `validate_arguments`.

use std::sync::Arc;

use chem_ops_types::{
    ArgValue, FieldType, OperationRegistry, OperationSpec, RenderConfig, StructuredCall,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::llm_client::{ChatMessage, LlmClient, ToolCallResult, ToolDefinition};

const SYSTEM_PROMPT: &str = "You are a natural language to Chemspeed translator. \
Correct any incorrect Chemspeed where you can and only use items contained in the \
function descriptions. Give your best estimate even if not enough information is provided.";

const FEW_SHOT_INSTRUCTION: &str = "Prime pump 1 with 30 mL using chemspd as manager.";

/// Extraction and validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionError {
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

    #[error("Model called '{returned}' instead of '{expected}'")]
    OperationMismatch { expected: String, returned: String },

    #[error("Model arguments are not a JSON object: {0}")]
    MalformedArguments(String),

    #[error("Function-calling model unavailable: {0}")]
    Collaborator(String),
}

/// A validated call plus what it was derived from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub call: StructuredCall,
    /// Rendered script line
    pub code: String,
    /// Raw model response
    pub raw: String,
}

/// Name of a JSON value's type, for mismatch reports
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Integer value of a float with no fractional part
fn whole_number(f: f64) -> Option<ArgValue> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
        .then(|| ArgValue::Integer(f as i64))
}

/// Coerce a JSON value to the declared field type
fn coerce(value: &Value, expected: FieldType) -> Option<ArgValue> {
    match (expected, value) {
        (FieldType::String, Value::String(s)) => Some(ArgValue::Text(s.clone())),
        (FieldType::String, Value::Number(n)) => Some(ArgValue::Text(n.to_string())),

        (FieldType::Number, Value::Number(n)) => Some(ArgValue::Number(n.clone())),
        (FieldType::Number, Value::String(s)) => s
            .trim()
            .parse::<serde_json::Number>()
            .ok()
            .map(ArgValue::Number),

        (FieldType::Integer, Value::Number(n)) => match n.as_i64() {
            Some(i) => Some(ArgValue::Integer(i)),
            None => n.as_f64().and_then(whole_number),
        },
        (FieldType::Integer, Value::String(s)) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(i) => Some(ArgValue::Integer(i)),
                Err(_) => s.parse::<f64>().ok().and_then(whole_number),
            }
        }

        _ => None,
    }
}

/// Validate model arguments against an operation schema
///
/// Argument order follows the input map. `null` values count as absent.
/// Defaults mentioned in descriptions are not filled in.
pub fn validate_arguments(
    operation: &OperationSpec,
    arguments: &serde_json::Map<String, Value>,
) -> Result<StructuredCall, ExtractionError> {
    let mut validated = IndexMap::with_capacity(arguments.len());

    for (field, value) in arguments {
        let spec = operation
            .field(field)
            .ok_or_else(|| ExtractionError::UnknownArgument {
                operation: operation.name.clone(),
                field: field.clone(),
            })?;

        if value.is_null() {
            continue;
        }

        let coerced = coerce(value, spec.field_type).ok_or_else(|| ExtractionError::TypeMismatch {
            operation: operation.name.clone(),
            field: field.clone(),
            expected: spec.field_type,
            found: format!("{} {}", json_type_name(value), value),
        })?;
        validated.insert(field.clone(), coerced);
    }

    let missing: Vec<String> = operation
        .required_arg_names()
        .into_iter()
        .filter(|name| !validated.contains_key(*name))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(ExtractionError::MissingRequiredArgument {
            operation: operation.name.clone(),
            fields: missing,
        });
    }

    Ok(StructuredCall::new(operation.name.clone(), validated))
}

/// Conversation sent for one instruction
pub fn extraction_messages(instruction: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(FEW_SHOT_INSTRUCTION),
        ChatMessage::assistant_call(ToolCallResult {
            tool_name: "prime_pumps".to_string(),
            arguments: serde_json::json!({"pump": 1, "volume": 30}),
            raw: String::new(),
        }),
        ChatMessage::user(format!(
            "Translate the following into Chemspeed syntax {}",
            instruction
        )),
    ]
}

/// Function-calling argument extractor
pub struct ArgumentExtractor {
    client: Arc<dyn LlmClient>,
    tools: Vec<ToolDefinition>,
    render: RenderConfig,
}

impl ArgumentExtractor {
    /// Offer every registered operation as a function
    pub fn new(client: Arc<dyn LlmClient>, registry: &OperationRegistry) -> Self {
        Self {
            client,
            tools: ToolDefinition::all(registry),
            render: registry.render_config().clone(),
        }
    }

    /// Extract and validate arguments for `operation` from `instruction`
    pub async fn extract(
        &self,
        instruction: &str,
        operation: &OperationSpec,
    ) -> Result<Extraction, ExtractionError> {
        let response = self.request(instruction, operation).await?;
        self.validate_response(operation, response)
    }

    /// Ask the model for arguments, forcing `operation`
    #[tracing::instrument(skip(self, operation), fields(operation = %operation.name))]
    pub async fn request(
        &self,
        instruction: &str,
        operation: &OperationSpec,
    ) -> Result<ToolCallResult, ExtractionError> {
        let messages = extraction_messages(instruction);
        let result = self
            .client
            .call_function(&messages, &self.tools, &operation.name)
            .await
            .map_err(|e| {
                tracing::warn!(
                    "Function call to {} failed: {}",
                    self.client.provider_name(),
                    e
                );
                ExtractionError::Collaborator(e.to_string())
            })?;

        tracing::debug!("Model arguments: {}", result.arguments);
        Ok(result)
    }

    /// Validate a model response against `operation` and render it
    pub fn validate_response(
        &self,
        operation: &OperationSpec,
        response: ToolCallResult,
    ) -> Result<Extraction, ExtractionError> {
        if response.tool_name != operation.name {
            return Err(ExtractionError::OperationMismatch {
                expected: operation.name.clone(),
                returned: response.tool_name,
            });
        }

        let arguments = match &response.arguments {
            Value::Object(map) => map,
            other => return Err(ExtractionError::MalformedArguments(other.to_string())),
        };

        let call = validate_arguments(operation, arguments)?;
        let code = call.render(operation, &self.render);
        tracing::info!("Synthesized {}", code);

        Ok(Extraction {
            call,
            code,
            raw: response.raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_client::ScriptedLlmClient;
    use proptest::prelude::*;
    use serde_json::json;

    fn registry() -> &'static OperationRegistry {
        OperationRegistry::global().unwrap()
    }

    fn op(name: &str) -> &'static OperationSpec {
        registry().get(name).unwrap()
    }

    fn args(value: Value) -> serde_json::Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_transfer_example() {
        let call = validate_arguments(
            op("transfer_liquid"),
            &args(json!({"source": "thf", "destination": "internal_standard", "volume": 10, "needle": 1})),
        )
        .unwrap();

        assert_eq!(call.get("source"), Some(&ArgValue::Text("thf".into())));
        assert_eq!(call.get("volume").and_then(ArgValue::as_f64), Some(10.0));
        assert_eq!(call.get("needle"), Some(&ArgValue::Integer(1)));
        assert_eq!(
            call.arguments.keys().collect::<Vec<_>>(),
            vec!["source", "destination", "volume", "needle"]
        );
    }

    #[test]
    fn test_schlenk_with_only_wells() {
        let call =
            validate_arguments(op("do_schlenk_cycles"), &args(json!({"wells": "rxn_well"}))).unwrap();
        assert_eq!(call.arguments.len(), 1);
    }

    #[test]
    fn test_unknown_argument() {
        let err = validate_arguments(
            op("prime_pumps"),
            &args(json!({"pump": 1, "volume": 30, "manager": "chemspd"})),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ExtractionError::UnknownArgument {
                operation: "prime_pumps".into(),
                field: "manager".into()
            }
        );
    }

    #[test]
    fn test_type_mismatch() {
        let err = validate_arguments(
            op("prime_pumps"),
            &args(json!({"pump": 1.5, "volume": 30})),
        )
        .unwrap_err();
        match err {
            ExtractionError::TypeMismatch {
                field, expected, ..
            } => {
                assert_eq!(field, "pump");
                assert_eq!(expected, FieldType::Integer);
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(matches!(
            validate_arguments(op("prime_pumps"), &args(json!({"pump": 1, "volume": "thirty"}))),
            Err(ExtractionError::TypeMismatch { .. })
        ));
        assert!(matches!(
            validate_arguments(op("filter_liquid"), &args(json!({"source_well": true}))),
            Err(ExtractionError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_coercion() {
        let call = validate_arguments(
            op("prime_pumps"),
            &args(json!({"pump": "2", "volume": "12.5"})),
        )
        .unwrap();
        assert_eq!(call.get("pump"), Some(&ArgValue::Integer(2)));
        assert_eq!(call.get("volume").and_then(ArgValue::as_f64), Some(12.5));

        let call = validate_arguments(op("prime_pumps"), &args(json!({"pump": 3.0, "volume": 1.0})))
            .unwrap();
        assert_eq!(call.get("pump"), Some(&ArgValue::Integer(3)));

        let call = validate_arguments(op("prime_pumps"), &args(json!({"pump": "4.0", "volume": 2})))
            .unwrap();
        assert_eq!(call.get("pump"), Some(&ArgValue::Integer(4)));
        for pump in ["4.5", "NaN", "inf", "four"] {
            assert!(
                matches!(
                    validate_arguments(op("prime_pumps"), &args(json!({"pump": pump, "volume": 2}))),
                    Err(ExtractionError::TypeMismatch { .. })
                ),
                "{pump}"
            );
        }
        assert_eq!(call.get("volume").map(ArgValue::render).as_deref(), Some("1.0"));

        let call = validate_arguments(
            op("filter_liquid"),
            &args(json!({"source_well": 4, "filtration_zone": "f1", "filtration_volume": 5})),
        )
        .unwrap();
        assert_eq!(call.get("source_well"), Some(&ArgValue::Text("4".into())));
    }

    #[test]
    fn test_missing_lists_every_field() {
        let err = validate_arguments(
            op("transfer_liquid"),
            &args(json!({"source": "thf", "needle": null})),
        )
        .unwrap_err();
        match err {
            ExtractionError::MissingRequiredArgument { fields, .. } => {
                assert!(fields.contains(&"destination".to_string()));
                assert!(fields.contains(&"volume".to_string()));
                assert!(!fields.contains(&"source".to_string()));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_messages() {
        let messages = extraction_messages("Filter the mixture.");
        assert_eq!(messages.len(), 4);
        assert_eq!(
            messages[3].content,
            "Translate the following into Chemspeed syntax Filter the mixture."
        );
        assert_eq!(
            messages[2].function_call.as_ref().map(|c| c.tool_name.as_str()),
            Some("prime_pumps")
        );
    }

    #[tokio::test]
    async fn test_extract_renders_call() {
        let client = Arc::new(ScriptedLlmClient::new().with_arguments(json!({
            "source": "thf", "destination": "internal_standard", "volume": 10, "needle": 1
        })));
        let extractor = ArgumentExtractor::new(client.clone(), registry());
        let extraction = extractor
            .extract("Transfer 10 mL of THF to the internal standard.", op("transfer_liquid"))
            .await
            .unwrap();

        assert_eq!(
            extraction.code,
            "chemspd.transfer_liquid(source=thf, destination=internal_standard, volume=10, needle=1)"
        );
        assert!(!extraction.raw.is_empty());

        let recorded = client.recorded();
        assert_eq!(recorded.forced, vec!["transfer_liquid"]);
    }

    #[tokio::test]
    async fn test_extract_routine() {
        let client = Arc::new(ScriptedLlmClient::new().with_arguments(json!({"wells": "rxn_well"})));
        let extractor = ArgumentExtractor::new(client, registry());
        let extraction = extractor
            .extract("Do Schlenk cycles on the reaction well.", op("do_schlenk_cycles"))
            .await
            .unwrap();
        assert_eq!(
            extraction.code,
            "routines.do_schlenk_cycles(chmspd=chmspd, wells=rxn_well)"
        );
    }

    #[tokio::test]
    async fn test_extract_failures() {
        let client = Arc::new(
            ScriptedLlmClient::new()
                .with_named_call("filter_liquid", json!({}))
                .with_arguments(Value::String("pump=1".into()))
                .with_call_error("timeout"),
        );
        let extractor = ArgumentExtractor::new(client, registry());
        let prime = op("prime_pumps");

        assert!(matches!(
            extractor.extract("Prime pump 1", prime).await,
            Err(ExtractionError::OperationMismatch { .. })
        ));
        assert!(matches!(
            extractor.extract("Prime pump 1", prime).await,
            Err(ExtractionError::MalformedArguments(_))
        ));
        assert!(matches!(
            extractor.extract("Prime pump 1", prime).await,
            Err(ExtractionError::Collaborator(_))
        ));
    }

    fn arg_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            (-1.0e6f64..1.0e6).prop_map(|f| json!(f)),
            "[0-9]{1,4}(\\.[0-9]{1,2})?".prop_map(Value::from),
            "[a-z_]{1,8}".prop_map(Value::from),
        ]
    }

    proptest! {
        #[test]
        fn validated_calls_match_schema(
            op_index in 0usize..6,
            values in prop::collection::vec(prop::option::of(arg_value()), 0..8),
            extra in prop::option::of("[a-z]{3,8}"),
        ) {
            let operation = &registry().get_all()[op_index % registry().get_all().len()];
            let mut arguments = serde_json::Map::new();
            for ((name, _), value) in operation.parameters.iter().zip(&values) {
                if let Some(value) = value {
                    arguments.insert(name.clone(), value.clone());
                }
            }
            if let Some(extra) = &extra {
                arguments.insert(format!("x_{extra}"), json!(1));
            }

            match validate_arguments(operation, &arguments) {
                Ok(call) => {
                    prop_assert!(extra.is_none());
                    for name in operation.required_arg_names() {
                        prop_assert!(call.get(name).is_some(), "missing {}", name);
                    }
                    for (name, value) in &call.arguments {
                        let spec = operation.field(name);
                        prop_assert!(spec.is_some());
                        prop_assert_eq!(value.field_type(), spec.map(|f| f.field_type).unwrap());
                        prop_assert!(!arguments[name].is_null());
                    }
                }
                Err(ExtractionError::UnknownArgument { field, .. }) => {
                    prop_assert_eq!(Some(field), extra.map(|e| format!("x_{e}")));
                }
                Err(ExtractionError::TypeMismatch { .. })
                | Err(ExtractionError::MissingRequiredArgument { .. }) => {}
                Err(other) => prop_assert!(false, "unexpected {:?}", other),
            }
        }
    }
}
