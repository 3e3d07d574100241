//! Lorekeeper Domain Layer
//!
//! Value types and boundary traits shared by every other Lorekeeper crate.
//! Nothing in here performs I/O.
//!
//! ## Key Concepts
//!
//! - **Chunk**: one bounded slice of a source document, with order metadata
//! - **Extraction category**: worldview, characters or plot; decides the
//!   shape of extracted data and how partial results are merged
//! - **Structured knowledge**: the final artifact assembled from the merged
//!   categories plus the relationship graph
//!
//! ## Boundaries
//!
//! - [`traits::LlmProvider`]: prompt in, completion text out
//! - [`traits::SimilarityIndex`]: query in, ranked passages out

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod category;
pub mod chunk;
pub mod knowledge;
pub mod traits;

// Re-exports for convenience
pub use category::{ExtractionCategory, ResultShape, UnknownCategory};
pub use chunk::{Chunk, SegmentMetadata, SEGMENT_METADATA_KEY};
pub use knowledge::{KnowledgeMetadata, Statistics, StructuredKnowledge};
pub use traits::{LlmProvider, NoIndex, SimilarityIndex};
