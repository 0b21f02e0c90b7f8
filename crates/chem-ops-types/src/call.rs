//! Structured calls and their script rendering.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::operation::{FieldType, OperationSpec};
use crate::registry::RenderConfig;

/// A validated argument value
///
/// Serialized untagged, so the JSON is the bare value. Deserializing picks
/// the first variant that fits: a whole `Number` such as `10` reads back as
/// `Integer`. Rendered script text is unchanged by that, but `field_type()`
/// of a deserialized value reflects its JSON shape, not the schema. Use
/// `validate_arguments` against the operation to recover declared types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Integer(i64),
    Number(serde_json::Number),
    Text(String),
}

impl ArgValue {
    /// The schema type this value satisfies
    pub fn field_type(&self) -> FieldType {
        match self {
            ArgValue::Integer(_) => FieldType::Integer,
            ArgValue::Number(_) => FieldType::Number,
            ArgValue::Text(_) => FieldType::String,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArgValue::Integer(i) => Some(*i as f64),
            ArgValue::Number(n) => n.as_f64(),
            ArgValue::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ArgValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Script text for this value
    ///
    /// Quote characters are stripped from strings so the rendered call stays
    /// well-formed.
    pub fn render(&self) -> String {
        match self {
            ArgValue::Integer(i) => i.to_string(),
            ArgValue::Number(n) => n.to_string(),
            ArgValue::Text(s) => s.chars().filter(|c| *c != '"' && *c != '\'').collect(),
        }
    }
}

impl std::fmt::Display for ArgValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// A validated operation call
///
/// Only built by argument validation, so every required field of the
/// operation is present with the declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredCall {
    pub operation_name: String,
    /// Arguments in the order the model returned them
    pub arguments: IndexMap<String, ArgValue>,
}

impl StructuredCall {
    pub fn new(operation_name: impl Into<String>, arguments: IndexMap<String, ArgValue>) -> Self {
        Self {
            operation_name: operation_name.into(),
            arguments,
        }
    }

    pub fn get(&self, field: &str) -> Option<&ArgValue> {
        self.arguments.get(field)
    }

    /// Render as an instrument script call
    ///
    /// Routines: `routines.name(chmspd=chmspd, a=1)`.
    /// Direct calls: `chemspd.name(a=1)`.
    pub fn render(&self, operation: &OperationSpec, config: &RenderConfig) -> String {
        let mut arguments = Vec::with_capacity(self.arguments.len() + 1);

        let namespace = if operation.routine {
            arguments.push(format!(
                "{binding}={binding}",
                binding = config.manager_binding
            ));
            &config.routine_namespace
        } else {
            &config.instrument_namespace
        };

        arguments.extend(
            self.arguments
                .iter()
                .map(|(name, value)| format!("{}={}", name, value.render())),
        );

        format!(
            "{}.{}({})",
            namespace,
            self.operation_name,
            arguments.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::OperationRegistry;

    fn transfer_call() -> StructuredCall {
        let mut args = IndexMap::new();
        args.insert("source".to_string(), ArgValue::Text("thf".to_string()));
        args.insert(
            "destination".to_string(),
            ArgValue::Text("internal_standard".to_string()),
        );
        args.insert("volume".to_string(), ArgValue::Number(10.into()));
        args.insert("needle".to_string(), ArgValue::Integer(1));
        StructuredCall::new("transfer_liquid", args)
    }

    #[test]
    fn test_json_round_trip_keeps_rendering() {
        let call = transfer_call();
        let json = serde_json::to_string(&call).unwrap();
        let back: StructuredCall = serde_json::from_str(&json).unwrap();

        // Whole numbers come back as integers
        assert_eq!(back.get("volume"), Some(&ArgValue::Integer(10)));
        assert_eq!(back.get("needle"), Some(&ArgValue::Integer(1)));

        let registry = OperationRegistry::global().unwrap();
        let op = registry.get("transfer_liquid").unwrap();
        assert_eq!(
            back.render(op, registry.render_config()),
            call.render(op, registry.render_config())
        );

        let fractional: ArgValue = serde_json::from_str("12.5").unwrap();
        assert_eq!(fractional.field_type(), FieldType::Number);
    }

    #[test]
    fn test_render_direct_call() {
        let registry = OperationRegistry::global().unwrap();
        let op = registry.get("transfer_liquid").unwrap();
        assert_eq!(
            transfer_call().render(op, registry.render_config()),
            "chemspd.transfer_liquid(source=thf, destination=internal_standard, volume=10, needle=1)"
        );
    }

    #[test]
    fn test_render_routine_injects_manager() {
        let registry = OperationRegistry::global().unwrap();
        let op = registry.get("do_schlenk_cycles").unwrap();
        let mut args = IndexMap::new();
        args.insert("wells".to_string(), ArgValue::Text("rxn_well".to_string()));
        let call = StructuredCall::new("do_schlenk_cycles", args);
        assert_eq!(
            call.render(op, registry.render_config()),
            "routines.do_schlenk_cycles(chmspd=chmspd, wells=rxn_well)"
        );
    }

    #[test]
    fn test_render_strips_quotes() {
        assert_eq!(
            ArgValue::Text("\"rxn_well\"".to_string()).render(),
            "rxn_well"
        );
        assert_eq!(ArgValue::Text("it's".to_string()).render(), "its");
    }

    #[test]
    fn test_render_keeps_float_text() {
        let n = serde_json::Number::from_f64(1.0).unwrap();
        assert_eq!(ArgValue::Number(n).render(), "1.0");
        let n = serde_json::Number::from_f64(0.1).unwrap();
        assert_eq!(ArgValue::Number(n).render(), "0.1");
    }

    #[test]
    fn test_render_is_deterministic() {
        let registry = OperationRegistry::global().unwrap();
        let op = registry.get("transfer_liquid").unwrap();
        let call = transfer_call();
        let first = call.render(op, registry.render_config());
        for _ in 0..10 {
            assert_eq!(call.render(op, registry.render_config()), first);
        }
    }

    #[test]
    fn test_custom_render_config() {
        let registry = OperationRegistry::global().unwrap();
        let op = registry.get("prime_pumps").unwrap();
        let config = RenderConfig {
            instrument_namespace: "cs".to_string(),
            routine_namespace: "r".to_string(),
            manager_binding: "mgr".to_string(),
        };
        let mut args = IndexMap::new();
        args.insert("pump".to_string(), ArgValue::Integer(1));
        let call = StructuredCall::new("prime_pumps", args);
        assert_eq!(call.render(op, &config), "r.prime_pumps(mgr=mgr, pump=1)");
    }
}
