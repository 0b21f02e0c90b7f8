//! Shared operation types for the Chemspeed translator
//!
//! Holds the operation catalog (registry), the parameter schema types and
//! the validated call type with its script rendering. No network or model
//! dependencies - both the matcher and the agentic crates build on this.

pub mod call;
pub mod operation;
pub mod registry;

pub use call::{ArgValue, StructuredCall};
pub use operation::{FieldSpec, FieldType, OperationSpec};
pub use registry::{OperationRegistry, RegistryError, RenderConfig};
