//! Similarity index over document passages

use crate::embedding::EmbeddingModel;
use crate::vector_index::VectorIndex;
use crate::StoreError;
use lorekeeper_domain::SimilarityIndex;
use tracing::debug;

const DEFAULT_EF_SEARCH: usize = 64;

/// Passages embedded into an HNSW index
///
/// Blank passages are skipped on insert. Searching an empty index returns
/// no passages rather than an error.
pub struct PassageIndex<E> {
    model: E,
    index: VectorIndex,
    passages: Vec<String>,
}

impl<E: EmbeddingModel> PassageIndex<E> {
    /// Create an empty index using `model` for embeddings
    pub fn new(model: E) -> Self {
        let index = VectorIndex::new(model.dimension());
        Self {
            model,
            index,
            passages: Vec::new(),
        }
    }

    /// Build an index from a sequence of passages
    pub fn from_passages<I, S>(model: E, passages: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = Self::new(model);
        for passage in passages {
            index.add_passage(passage)?;
        }
        debug!(passages = index.len(), "Built passage index");
        Ok(index)
    }

    /// Embed and insert one passage
    pub fn add_passage(&mut self, passage: impl Into<String>) -> Result<(), StoreError> {
        let passage = passage.into();
        if passage.trim().is_empty() {
            return Ok(());
        }

        let embedding = self.model.embed(&passage)?;
        let id = self.index.add(&embedding)?;
        debug_assert_eq!(id, self.passages.len());
        self.passages.push(passage);
        Ok(())
    }

    /// Number of indexed passages
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    /// Whether nothing has been indexed
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Search returning passages with their similarity scores, best first
    pub fn search_scored(&self, query: &str, k: usize) -> Result<Vec<(&str, f32)>, StoreError> {
        if self.passages.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.model.embed(query)?;
        let hits = self.index.search(&query_embedding, k, DEFAULT_EF_SEARCH)?;

        hits.into_iter()
            .map(|(id, score)| {
                self.passages
                    .get(id)
                    .map(|p| (p.as_str(), score))
                    .ok_or_else(|| StoreError::InvalidData(format!("Unknown passage id {}", id)))
            })
            .collect()
    }
}

impl<E: EmbeddingModel> SimilarityIndex for PassageIndex<E> {
    type Error = StoreError;

    fn search(&self, query: &str, k: usize) -> Result<Vec<String>, Self::Error> {
        Ok(self
            .search_scored(query, k)?
            .into_iter()
            .map(|(passage, _)| passage.to_string())
            .collect())
    }
}
