//! Lorekeeper Storage Layer
//!
//! Everything that outlives a single pipeline run, plus the similarity index
//! the parser narrows chunks through.
//!
//! # Architecture
//!
//! - [`passages::PassageIndex`]: embedding model + HNSW index over passages,
//!   implementing `SimilarityIndex`
//! - [`persistence`]: the final artifact as pretty-printed JSON
//! - [`checkpoint::StageCheckpoint`]: per-stage partial results so an
//!   interrupted run can resume
//!
//! # Examples
//!
//! ```
//! use lorekeeper_store::{HashEmbeddingModel, PassageIndex};
//! use lorekeeper_domain::SimilarityIndex;
//!
//! let index = PassageIndex::from_passages(
//!     HashEmbeddingModel::new(256),
//!     ["The castle stands on a cliff.", "Mira distrusts the king."],
//! ).unwrap();
//!
//! let hits = index.search("castle cliff", 1).unwrap();
//! assert_eq!(hits, vec!["The castle stands on a cliff.".to_string()]);
//! ```

#![warn(missing_docs)]

pub mod checkpoint;
pub mod embedding;
pub mod passages;
pub mod persistence;
pub mod vector_index;

use thiserror::Error;

pub use checkpoint::{document_fingerprint, StageCheckpoint, CHECKPOINT_FILE, SOURCE_KEY};
pub use embedding::{EmbeddingError, EmbeddingModel, HashEmbeddingModel};
pub use passages::PassageIndex;
pub use persistence::{load_knowledge, save_knowledge, DEFAULT_KNOWLEDGE_FILE};
pub use vector_index::{VectorIndex, VectorIndexError};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON on disk, or a value that cannot be serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Vector index error
    #[error("Vector index error: {0}")]
    VectorIndex(#[from] VectorIndexError),

    /// Embedding error
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result alias for storage operations
pub type Result<T> = std::result::Result<T, StoreError>;
