//! Chemspeed procedure translator
//!
//! Turns a free-text laboratory procedure into executable instrument script.
//!
//! ## Pipeline
//!
//! ```text
//! procedure text
//!   → Segmenter (completion model)            chem-agentic
//!   → SemanticMatcher (TF-IDF, per action)    chem-semantic-matcher
//!   → ArgumentExtractor (forced function call) chem-agentic
//!   → validated StructuredCall → script line  chem-ops-types
//! ```
//!
//! Segmentation failure stops the conversion. Any later failure is recorded
//! on the instruction it belongs to and the remaining instructions still run.
//!
//! ## Example
//!
//! ```ignore
//! let client = chem_agentic::create_llm_client()?;
//! let converter = ProcedureConverter::new(client)?;
//! let report = converter.convert(procedure).await?;
//! println!("{}", report.script());
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod orchestrator;

pub use config::{ConfigError, PipelineConfig};
pub use error::{ConversionError, InstructionError};
pub use events::{EventEmitter, EventPayload, EventReceiver, PipelineEvent, SharedEmitter};
pub use orchestrator::{
    ConversionReport, ConverterBuilder, InstructionOutcome, ProcedureConverter, SynthesizedCall,
};

pub use chem_agentic as agentic;
pub use chem_ops_types as ops;
pub use chem_semantic_matcher as matcher;
