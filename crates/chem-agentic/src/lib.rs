//! LLM-powered segmentation and argument extraction
//!
//! This crate holds everything that talks to a language model. It has no
//! matcher or pipeline dependencies - orchestration stays in chem-poc.
//!
//! ## Architecture
//!
//! ```text
//! Procedure text → Segmenter (completion) → instructions
//! Instruction + matched operation → ArgumentExtractor (forced function call)
//!     → validate_arguments → StructuredCall → rendered script line
//! ```
//!
//! ## Backend Selection
//!
//! Set `AGENT_BACKEND` environment variable:
//! - `openai` (default): OpenAI chat completions
//! - `anthropic`: Anthropic messages API

// LLM client abstraction
pub mod anthropic_client;
pub mod backend;
pub mod client_factory;
pub mod llm_client;
pub mod mock_client;
pub mod openai_client;

// Pipeline stages
pub mod extractor;
pub mod segmenter;

// Re-exports for convenience
pub use backend::AgentBackend;
pub use client_factory::{create_llm_client, create_llm_client_for, create_llm_client_with_key};
pub use extractor::{validate_arguments, ArgumentExtractor, Extraction, ExtractionError};
pub use llm_client::{ChatMessage, CompletionRequest, LlmClient, ToolCallResult, ToolDefinition};
pub use mock_client::ScriptedLlmClient;
pub use segmenter::{split_actions, Instruction, SegmentError, Segmenter};
