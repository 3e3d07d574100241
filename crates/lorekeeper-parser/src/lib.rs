//! Lorekeeper Parser
//!
//! Extracts structured knowledge (worldview, characters, plot outline and
//! character relationships) from documents far larger than a model's
//! context window.
//!
//! # Architecture
//!
//! ```text
//! Text → preprocess → Segmenter → Chunks
//!      → Dispatcher (bounded workers) → SegmentExtractor → LLM
//!      → HierarchicalMerger (groups of N, structural fallback)
//!      → RelationshipAnalyzer → StructuredKnowledge
//! ```
//!
//! # Key Features
//!
//! - **Word-safe segmentation**: chunks end on word boundaries, with a
//!   dictionary segmenter for Chinese text
//! - **Context narrowing**: an optional similarity index picks the most
//!   relevant passages for each category
//! - **Failure tolerance**: failed segments are dropped, malformed responses
//!   are kept as raw text, failed merges fall back to a deterministic merge
//! - **Order preservation**: results are aggregated in chunk order no matter
//!   which worker finishes first
//! - **Resumability**: finished stages can be checkpointed to disk
//!
//! # Example Usage
//!
//! ```no_run
//! use lorekeeper_llm::{NetworkConfig, OllamaProvider};
//! use lorekeeper_parser::{KnowledgeParser, ParserConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let llm = OllamaProvider::new("http://localhost:11434", "qwen2.5:7b", &NetworkConfig::default())?;
//! let parser = KnowledgeParser::new(Arc::new(llm), ParserConfig::default())?
//!     .with_checkpoint_dir("./output");
//!
//! let text = std::fs::read_to_string("novel.txt")?;
//! if let Some(knowledge) = parser.parse_document(&text, Some("novel.txt")).await {
//!     println!("{} characters", knowledge.statistics.character_count);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod dispatcher;
mod error;
mod extractor;
mod knowledge_parser;
mod merger;
pub mod prompt;
mod relationships;
pub mod response;
mod retriever;
mod segmenter;
pub mod structural;
mod tokenizer;

#[cfg(test)]
mod tests;

pub use config::ParserConfig;
pub use dispatcher::{Dispatcher, StopHandle};
pub use error::ParserError;
pub use extractor::SegmentExtractor;
pub use knowledge_parser::KnowledgeParser;
pub use merger::HierarchicalMerger;
pub use relationships::RelationshipAnalyzer;
pub use retriever::ContextRetriever;
pub use segmenter::{preprocess, split_passages, Segmenter};
pub use tokenizer::{contains_cjk, AutoTokenizer, JiebaTokenizer, WhitespaceTokenizer, WordTokenizer};
