//! HNSW Vector Index
//!
//! Approximate nearest-neighbour search over passage embeddings.
//!
//! # HNSW Parameters
//!
//! - **M**: bi-directional links per node (16)
//! - **efConstruction**: candidate list size while building (200)
//! - **efSearch**: candidate list size while querying; chosen per search

use hnsw_rs::prelude::*;
use std::sync::Mutex;
use thiserror::Error;

const DEFAULT_M: usize = 16;
const DEFAULT_EF_CONSTRUCTION: usize = 200;
const DEFAULT_MAX_ELEMENTS: usize = 100_000;

/// Errors that can occur during vector index operations
#[derive(Error, Debug)]
pub enum VectorIndexError {
    /// Invalid embedding dimension
    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension provided
        actual: usize,
    },

    /// Internal HNSW error
    #[error("HNSW error: {0}")]
    Internal(String),
}

/// In-memory HNSW index of embeddings keyed by insertion order
///
/// Ids are assigned sequentially from 0, so callers can keep the payloads
/// in a plain `Vec` indexed by id.
///
/// # Examples
///
/// ```
/// use lorekeeper_store::VectorIndex;
///
/// let index = VectorIndex::new(3);
/// let a = index.add(&[1.0, 0.0, 0.0]).unwrap();
/// let _b = index.add(&[0.0, 1.0, 0.0]).unwrap();
///
/// let results = index.search(&[1.0, 0.0, 0.0], 1, 16).unwrap();
/// assert_eq!(results[0].0, a);
/// ```
pub struct VectorIndex {
    dimension: usize,
    inner: Mutex<Inner>,
}

struct Inner {
    hnsw: Hnsw<'static, f32, DistCosine>,
    len: usize,
}

impl Inner {
    fn empty() -> Self {
        let nb_layer = 16.min((DEFAULT_MAX_ELEMENTS as f32).ln().trunc() as usize);
        Self {
            hnsw: Hnsw::<'static, f32, DistCosine>::new(
                DEFAULT_M,
                DEFAULT_MAX_ELEMENTS,
                nb_layer,
                DEFAULT_EF_CONSTRUCTION,
                DistCosine {},
            ),
            len: 0,
        }
    }
}

impl VectorIndex {
    /// Create a new vector index with the specified dimension
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            inner: Mutex::new(Inner::empty()),
        }
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<(), VectorIndexError> {
        if embedding.len() != self.dimension {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, VectorIndexError> {
        self.inner
            .lock()
            .map_err(|_| VectorIndexError::Internal("index lock poisoned".to_string()))
    }

    /// Add an embedding, returning its id
    pub fn add(&self, embedding: &[f32]) -> Result<usize, VectorIndexError> {
        self.check_dimension(embedding)?;

        let mut inner = self.lock()?;
        let id = inner.len;
        let embedding_vec = embedding.to_vec();
        inner.hnsw.insert((&embedding_vec, id));
        inner.len += 1;

        Ok(id)
    }

    /// Search for the `k` nearest neighbours of `query`
    ///
    /// Returns `(id, similarity)` pairs, most similar first.
    pub fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Result<Vec<(usize, f32)>, VectorIndexError> {
        self.check_dimension(query)?;

        let inner = self.lock()?;
        if inner.len == 0 || k == 0 {
            return Ok(Vec::new());
        }

        let mut results: Vec<(usize, f32)> = inner
            .hnsw
            .search(query, k, ef_search.max(k))
            .into_iter()
            .map(|neighbour| (neighbour.d_id, 1.0 - neighbour.distance))
            .collect();
        results.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(results)
    }

    /// Get the number of vectors in the index
    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.len).unwrap_or(0)
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embedding dimension this index accepts
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}
