//! Operation Registry
//!
//! Single source of truth for the operations the platform supports. The same
//! catalog feeds the semantic matcher (descriptions), the function-calling
//! request (parameter schemas) and call rendering (routine flag).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     OperationRegistry                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Source: config/operations.yaml (embedded at compile time)  │
//! │  ├── operations (declaration order = tie-break order)       │
//! │  └── rendering  (namespaces + manager handle binding)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::operation::OperationSpec;

/// Embedded default catalog
const DEFAULT_CATALOG: &str = include_str!("../config/operations.yaml");

/// The global registry - loaded once
static GLOBAL_REGISTRY: OnceLock<Result<OperationRegistry, RegistryError>> = OnceLock::new();

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("Operation '{0}' is registered more than once")]
    DuplicateOperation(String),

    #[error("Invalid operation catalog: {0}")]
    InvalidCatalog(String),
}

/// How calls are rendered into instrument script text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Qualifier for direct instrument calls
    pub instrument_namespace: String,
    /// Qualifier for routine calls
    pub routine_namespace: String,
    /// Name of the shared instrument-manager handle injected into routines
    pub manager_binding: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            instrument_namespace: "chemspd".to_string(),
            routine_namespace: "routines".to_string(),
            manager_binding: "chmspd".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    rendering: RenderConfig,
    operations: Vec<OperationSpec>,
}

/// Immutable catalog of supported operations
#[derive(Debug, Clone)]
pub struct OperationRegistry {
    operations: Vec<OperationSpec>,
    rendering: RenderConfig,
}

impl OperationRegistry {
    /// Get the global registry instance (embedded catalog)
    pub fn global() -> Result<&'static OperationRegistry, RegistryError> {
        GLOBAL_REGISTRY
            .get_or_init(|| Self::from_yaml(DEFAULT_CATALOG))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Build a registry from a YAML catalog
    pub fn from_yaml(source: &str) -> Result<Self, RegistryError> {
        let catalog: CatalogFile = serde_yaml::from_str(source)
            .map_err(|e| RegistryError::InvalidCatalog(e.to_string()))?;
        Self::new(catalog.operations, catalog.rendering)
    }

    /// Build a registry from already-parsed operations
    pub fn new(
        operations: Vec<OperationSpec>,
        rendering: RenderConfig,
    ) -> Result<Self, RegistryError> {
        if operations.is_empty() {
            return Err(RegistryError::InvalidCatalog(
                "catalog declares no operations".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for op in &operations {
            if !seen.insert(op.name.as_str()) {
                return Err(RegistryError::DuplicateOperation(op.name.clone()));
            }
        }

        tracing::debug!("Loaded operation registry with {} operations", operations.len());

        Ok(Self {
            operations,
            rendering,
        })
    }

    /// All operations in registration order
    pub fn get_all(&self) -> &[OperationSpec] {
        &self.operations
    }

    /// Look up an operation by name
    pub fn get(&self, name: &str) -> Result<&OperationSpec, RegistryError> {
        self.operations
            .iter()
            .find(|op| op.name == name)
            .ok_or_else(|| RegistryError::UnknownOperation(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.iter().any(|op| op.name == name)
    }

    /// Operation names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.operations.iter().map(|op| op.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn render_config(&self) -> &RenderConfig {
        &self.rendering
    }

    /// Every operation as a function definition for function-calling models
    pub fn tool_schemas(&self) -> Vec<serde_json::Value> {
        self.operations
            .iter()
            .map(|op| {
                serde_json::json!({
                    "name": &op.name,
                    "description": &op.description,
                    "parameters": op.parameters_schema(),
                })
            })
            .collect()
    }
}
