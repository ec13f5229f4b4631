//! Fact extraction and the analysis pipeline.
//!
//! Extraction is the only stage that talks to the outside world, so it sits
//! behind the [`FactExtractor`] trait. [`Analyst`] chains it with the
//! deterministic stages from `compliance-core`.

mod analyst;
mod error;
mod extractor;
pub mod rules;

#[cfg(feature = "llm")]
pub mod llm;

pub use analyst::{Analyst, AnalystSettings};
pub use error::{AnalysisError, ExtractionError};
pub use extractor::{FactExtractor, split_sentences};
pub use rules::RuleExtractor;

#[cfg(feature = "llm")]
pub use llm::{LlmConfig, LlmExtractor};
