//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the extraction core and the
//! services it calls. Implementations live in other crates.
//!
//! Both traits are synchronous: the parser runs them on a bounded pool of
//! blocking workers, so an implementation may block for the whole network
//! round trip.

use std::convert::Infallible;
use std::fmt::Display;

/// Trait for LLM completion services
///
/// Implemented by the infrastructure layer (lorekeeper-llm)
pub trait LlmProvider {
    /// Error type for completion calls (transient failures)
    type Error: Display;

    /// Generate a text completion for `prompt`
    fn generate(&self, prompt: &str) -> Result<String, Self::Error>;

    /// Human-readable model identifier, recorded in logs
    fn model_name(&self) -> &str {
        "llm"
    }
}

/// Trait for vector similarity search over a previously indexed corpus
///
/// Implemented by the storage layer (lorekeeper-store)
pub trait SimilarityIndex {
    /// Error type for search operations
    type Error: Display;

    /// Return up to `k` passages most relevant to `query`, best first
    fn search(&self, query: &str, k: usize) -> Result<Vec<String>, Self::Error>;
}

/// Placeholder index type for parsers built without a similarity index
///
/// It is never queried: a parser holding `Option<NoIndex>` always takes the
/// prefix fallback path.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIndex;

impl SimilarityIndex for NoIndex {
    type Error = Infallible;

    fn search(&self, _query: &str, _k: usize) -> Result<Vec<String>, Self::Error> {
        Ok(Vec::new())
    }
}
