//! Embedding Model for Text Vectorization
//!
//! Text-to-vector conversion for passage retrieval. The shipped model is a
//! feature-hashing bag of words: no model files, deterministic, and good
//! enough to rank passages by keyword overlap. Real models plug in through
//! [`EmbeddingModel`].
//!
//! # Examples
//!
//! ```rust
//! use lorekeeper_store::embedding::{EmbeddingModel, HashEmbeddingModel};
//!
//! let model = HashEmbeddingModel::new(384);
//! let embedding = model.embed("The sky is blue").unwrap();
//! assert_eq!(embedding.len(), 384);
//!
//! // Same text always produces same embedding
//! assert_eq!(embedding, model.embed("The sky is blue").unwrap());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Errors that can occur during embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Invalid input text
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model inference error
    #[error("Model inference failed: {0}")]
    InferenceFailed(String),
}

/// Trait for embedding models
pub trait EmbeddingModel: Send + Sync {
    /// Generate an embedding vector for the given text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Get the dimension of embeddings produced by this model
    fn dimension(&self) -> usize;
}

/// Deterministic feature-hashing embedding model
///
/// Latin-script text contributes lowercase word tokens; CJK text contributes
/// single characters and adjacent-character bigrams. Each token is hashed to
/// a signed bucket, and the vector is normalized to unit length so cosine
/// similarity reflects shared vocabulary.
#[derive(Debug, Clone)]
pub struct HashEmbeddingModel {
    dimension: usize,
}

impl HashEmbeddingModel {
    /// Create a new model producing `dimension`-sized vectors
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn hash_token(token: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        hasher.finish()
    }

    fn add_token(&self, embedding: &mut [f32], token: &str) {
        let hash = Self::hash_token(token);
        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        embedding[bucket] += sign;
    }
}

impl Default for HashEmbeddingModel {
    fn default() -> Self {
        Self::new(384)
    }
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{3040}'..='\u{30FF}'
        | '\u{AC00}'..='\u{D7AF}'
        | '\u{F900}'..='\u{FAFF}')
}

impl EmbeddingModel for HashEmbeddingModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "Empty text cannot be embedded".to_string(),
            ));
        }

        let mut embedding = vec![0.0f32; self.dimension];
        let mut word = String::new();
        let mut previous_cjk: Option<char> = None;

        for c in text.chars() {
            if is_cjk(c) {
                if !word.is_empty() {
                    self.add_token(&mut embedding, &word);
                    word.clear();
                }
                let mut buf = [0u8; 4];
                self.add_token(&mut embedding, c.encode_utf8(&mut buf));
                if let Some(prev) = previous_cjk {
                    let bigram: String = [prev, c].iter().collect();
                    self.add_token(&mut embedding, &bigram);
                }
                previous_cjk = Some(c);
            } else {
                previous_cjk = None;
                if c.is_alphanumeric() {
                    word.extend(c.to_lowercase());
                } else if !word.is_empty() {
                    self.add_token(&mut embedding, &word);
                    word.clear();
                }
            }
        }
        if !word.is_empty() {
            self.add_token(&mut embedding, &word);
        }

        let mut magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();

        // Punctuation-only input has no tokens; hash the whole text instead
        if magnitude == 0.0 {
            self.add_token(&mut embedding, text.trim());
            magnitude = 1.0;
        }

        for value in &mut embedding {
            *value /= magnitude;
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
