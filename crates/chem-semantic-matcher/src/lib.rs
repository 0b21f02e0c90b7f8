//! Semantic Instruction Matcher
//!
//! Picks the operation whose description is most similar to a free-text lab
//! instruction. Pure Rust, no model downloads: text is normalized (stop-words,
//! punctuation, lemmas) and compared in a TF-IDF vector space.
//!
//! # Architecture
//!
//! ```text
//! Instruction "Prime pump 1 with 30 mL using chemspd as manager."
//!       │
//!       ▼
//! ┌─────────────────────────────────────────┐
//! │  Normalizer                             │
//! │  → [prime, pump, 1, 30, ml, chemspd, …] │
//! └─────────────────────────────────────────┘
//!       │   + normalized operation descriptions
//!       ▼
//! ┌─────────────────────────────────────────┐
//! │  TF-IDF fit over instruction + catalog  │
//! └─────────────────────────────────────────┘
//!       │
//!       ▼
//! ┌─────────────────────────────────────────┐
//! │  Cosine similarity, argmax              │
//! │  (ties → registry order)                │
//! └─────────────────────────────────────────┘
//!       │
//!       ▼
//!   MatchResult { operation_name: "prime_pumps", confidence }
//! ```

pub mod matcher;
pub mod normalizer;
pub mod similarity;
pub mod tfidf;
pub mod types;

pub use matcher::{match_operation, SemanticMatcher};
pub use normalizer::Normalizer;
pub use types::*;
