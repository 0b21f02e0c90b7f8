//! Operation and parameter schemas.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Declared type of an operation parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
}

impl FieldType {
    /// JSON Schema type name
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameter definition for an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

/// One supported instrument operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationSpec {
    pub name: String,
    pub description: String,
    /// Routines run as multi-step procedures bound to the manager handle
    #[serde(default)]
    pub routine: bool,
    /// Parameters in declaration order
    #[serde(default)]
    pub parameters: IndexMap<String, FieldSpec>,
}

impl OperationSpec {
    /// Check if the operation declares a given parameter
    pub fn accepts_arg(&self, key: &str) -> bool {
        self.parameters.contains_key(key)
    }

    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.parameters.get(key)
    }

    /// Required parameter names, in declaration order
    pub fn required_arg_names(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|(_, f)| f.required)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Optional parameter names, in declaration order
    pub fn optional_arg_names(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|(_, f)| !f.required)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// JSON Schema object describing the parameters
    ///
    /// Shape: `{"type": "object", "properties": {..}, "required": [..]}`
    pub fn parameters_schema(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .parameters
            .iter()
            .map(|(name, field)| {
                (
                    name.clone(),
                    serde_json::json!({
                        "type": field.field_type.as_str(),
                        "description": &field.description,
                    }),
                )
            })
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": self.required_arg_names(),
        })
    }
}
